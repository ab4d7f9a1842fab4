use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use qtfile::{Diagnostics, FourCC, Movie, Value, default_registry};
use std::fs::File;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Modify atoms and fields in a QuickTime movie",
    after_help = "Field modifications are key:converter:value triples, for example:\n\n\
                  \tqtknife -M colr -F matrix:int:2 input.mov output.mov"
)]
struct Args {
    /// Source movie path
    input: String,

    /// Destination movie path
    output: String,

    /// Strip specific atom types (comma-separated 4CCs)
    #[arg(short = 'S', long = "strip-types")]
    strip_types: Option<String>,

    /// Modify specific atom types (comma-separated 4CCs)
    #[arg(short = 'M', long = "modify-types")]
    modify_types: Option<String>,

    /// Modify atom field values (comma-separated key:converter:value)
    #[arg(short = 'F', long = "fields")]
    fields: Option<String>,

    /// Enable debugging output
    #[arg(short = 'D', long, action = ArgAction::SetTrue)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _logger =
        flexi_logger::Logger::try_with_str(if args.debug { "debug" } else { "warn" })?.start()?;

    let strip = args.strip_types.as_deref().map(parse_kinds).transpose()?;
    let modify = args.modify_types.as_deref().map(parse_kinds).transpose()?;
    let edits = args.fields.as_deref().map(parse_edits).transpose()?;

    let registry = default_registry();
    let mut diag = Diagnostics::new();

    let mut src = File::open(&args.input).with_context(|| format!("open {}", args.input))?;
    let mut movie = Movie::read(&mut src, &registry, &mut diag);

    if let Some(kinds) = &strip {
        for id in movie.find(kinds) {
            println!("[{}] -> [free]", movie.node(id).kind);
            movie.free(id);
        }
    }

    if let (Some(kinds), Some(edits)) = (&modify, &edits) {
        for id in movie.find(kinds) {
            println!("[{}]", movie.node(id).kind);
            for edit in edits {
                apply_edit(&mut movie, id, edit)?;
            }
        }
    }

    let mut out = File::create(&args.output).with_context(|| format!("create {}", args.output))?;
    movie.write(&mut src, &mut out, &registry, &mut diag)?;

    for d in diag.entries() {
        eprintln!("{d}");
    }

    Ok(())
}

fn parse_kinds(spec: &str) -> anyhow::Result<Vec<FourCC>> {
    spec.split(',')
        .map(|s| FourCC::from_str(s).with_context(|| format!("'{s}' is not a 4-byte kind")))
        .collect()
}

#[derive(Debug)]
struct FieldEdit {
    key: String,
    converter: String,
    raw: String,
}

fn parse_edits(spec: &str) -> anyhow::Result<Vec<FieldEdit>> {
    spec.split(',')
        .map(|part| {
            let mut it = part.splitn(3, ':');
            match (it.next(), it.next(), it.next()) {
                (Some(key), Some(converter), Some(raw)) => Ok(FieldEdit {
                    key: key.to_string(),
                    converter: converter.to_string(),
                    raw: raw.to_string(),
                }),
                _ => bail!("'{part}' is not a key:converter:value triple"),
            }
        })
        .collect()
}

fn apply_edit(movie: &mut Movie, id: qtfile::AtomId, edit: &FieldEdit) -> anyhow::Result<()> {
    let node = movie.node_mut(id);
    let Some(current) = node.field(&edit.key).cloned() else {
        println!("| {} (no such field)", edit.key);
        return Ok(());
    };

    let next = convert_field(&current, &edit.converter, &edit.raw)
        .with_context(|| format!("field '{}'", edit.key))?;
    println!("| {}={} -> {}", edit.key, current, next);

    if let Some(fields) = node.fields_mut() {
        fields.set(&edit.key, next);
    }
    Ok(())
}

/// Convert a command-line value into the same variant as the field it
/// replaces, so atom sizes stay stable across the edit.
fn convert_field(current: &Value, converter: &str, raw: &str) -> anyhow::Result<Value> {
    match converter {
        "int" => {
            let value = match current {
                Value::U8(_) => Value::U8(raw.parse()?),
                Value::I8(_) => Value::I8(raw.parse()?),
                Value::U16(_) => Value::U16(raw.parse()?),
                Value::I16(_) => Value::I16(raw.parse()?),
                Value::U32(_) => Value::U32(raw.parse()?),
                Value::I32(_) => Value::I32(raw.parse()?),
                Value::U64(_) => Value::U64(raw.parse()?),
                Value::I64(_) => Value::I64(raw.parse()?),
                other => bail!("cannot apply int converter to {other}"),
            };
            Ok(value)
        }
        "str" => match current {
            Value::FourCC(_) => {
                let cc = FourCC::from_str(raw)
                    .with_context(|| format!("'{raw}' is not a 4-byte kind"))?;
                Ok(Value::FourCC(cc))
            }
            Value::Bytes(existing) => {
                // Pad or truncate to the existing width.
                let mut bytes = raw.as_bytes().to_vec();
                bytes.resize(existing.len(), 0);
                Ok(Value::Bytes(bytes))
            }
            other => bail!("cannot apply str converter to {other}"),
        },
        other => bail!("unknown converter '{other}' (expected int or str)"),
    }
}
