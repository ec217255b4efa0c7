use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use jsom::runtime::array_buffer::ArrayBuffer;
use jsom::runtime::data_view::DataView;
use jsom::runtime::typed_array::{Endian, TypedArrayKind, TypedArrayView};
use jsom::{JsResult, JsValue, Realm, RealmConfig};

#[derive(Parser)]
#[command(name = "jsom", version, about = "Inspect the jsom object model")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// How far past the end of an array a write may land before it goes sparse
    #[arg(long, global = true)]
    sparse_gap: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the global builtins
    Builtins {
        /// Create every builtin instead of just listing it
        #[arg(long)]
        materialize: bool,
    },
    /// Decode hex bytes as typed array elements
    View {
        /// Element type, e.g. int16, Float64Array, biguint64
        #[arg(long)]
        kind: String,
        /// Bytes as hex; whitespace and a leading 0x are ignored
        hex: String,
        /// Byte offset into the buffer
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Number of elements (default: to the end of the buffer)
        #[arg(long)]
        length: Option<usize>,
        /// Byte order; anything but native reads through a DataView
        #[arg(long, value_enum, default_value_t = EndianArg::Native)]
        endian: EndianArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EndianArg {
    Native,
    Little,
    Big,
}

impl From<EndianArg> for Endian {
    fn from(arg: EndianArg) -> Self {
        match arg {
            EndianArg::Native => Endian::Native,
            EndianArg::Little => Endian::Little,
            EndianArg::Big => Endian::Big,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits: String = text
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if !digits.is_ascii() {
        return Err(format!("invalid hex input '{text}'"));
    }
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in '{text}'"));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("invalid hex byte '{}'", &digits[i..i + 2]))
        })
        .collect()
}

fn decode_elements(
    bytes: Vec<u8>,
    kind: TypedArrayKind,
    offset: usize,
    length: Option<usize>,
    endian: Endian,
) -> JsResult<Vec<JsValue>> {
    let buffer = ArrayBuffer::from_bytes(bytes);
    if endian == Endian::Native {
        return Ok(TypedArrayView::new(buffer, offset, length, kind)?.to_values());
    }
    let size = kind.bytes_per_element();
    let view = DataView::new(buffer, offset, length.map(|n| n * size))?;
    let count = view.byte_length() / size;
    (0..count).map(|i| view.get(i * size, kind, endian)).collect()
}

fn list_builtins(realm: &mut Realm, materialize: bool) -> ExitCode {
    for name in realm.builtin_names() {
        if materialize && let Err(err) = realm.get_builtin(name) {
            eprintln!("{name}: {err}");
            return ExitCode::from(1);
        }
        let state = if realm.is_materialized(name) {
            "ready"
        } else {
            "lazy"
        };
        println!("{name}\t{state}");
    }
    ExitCode::SUCCESS
}

fn view_bytes(
    kind: &str,
    hex: &str,
    offset: usize,
    length: Option<usize>,
    endian: Endian,
) -> ExitCode {
    let Some(kind) = TypedArrayKind::from_name(kind) else {
        eprintln!("Unknown element kind '{kind}'");
        return ExitCode::from(2);
    };
    let bytes = match parse_hex(hex) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };
    match decode_elements(bytes, kind, offset, length, endian) {
        Ok(values) => {
            let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
            println!("{} [{}]", kind.name(), rendered.join(", "));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(1)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = RealmConfig::default();
    if let Some(gap) = cli.sparse_gap {
        config.sparse_gap_threshold = gap;
    }

    match cli.command {
        Command::Builtins { materialize } => {
            let mut realm = Realm::with_config(config);
            list_builtins(&mut realm, materialize)
        }
        Command::View {
            kind,
            hex,
            offset,
            length,
            endian,
        } => view_bytes(&kind, &hex, offset, length, endian.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex("0x01 ff").unwrap(), vec![1, 255]);
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn explicit_byte_order_reads_through_a_data_view() {
        let values =
            decode_elements(vec![0, 1, 0, 2], TypedArrayKind::Uint16, 0, None, Endian::Big)
                .unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].as_number(), Some(1.0));
        assert_eq!(values[1].as_number(), Some(2.0));

        let values =
            decode_elements(vec![9, 1, 0], TypedArrayKind::Uint16, 1, Some(1), Endian::Little)
                .unwrap();
        assert_eq!(values[0].as_number(), Some(1.0));
    }

    #[test]
    fn native_order_requires_alignment() {
        assert!(decode_elements(vec![0; 4], TypedArrayKind::Int16, 1, None, Endian::Native).is_err());
    }
}
