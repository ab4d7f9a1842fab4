use anyhow::Context;
use clap::{ArgAction, Parser};
use qtfile::{AtomBody, AtomId, Diagnostics, FourCC, Movie, default_registry};
use qtfile::util::{hex_dump, read_slice};
use serde::Serialize;
use std::fs::File;

#[derive(Parser, Debug)]
#[command(version, about = "Dump the atom tree of QuickTime movies")]
struct Args {
    /// Movie file path(s)
    #[arg(required = true)]
    paths: Vec<String>,

    /// Only show atoms of these kinds (comma-separated 4CCs)
    #[arg(long = "types")]
    types: Option<String>,

    /// Do not show atom fields and values
    #[arg(long = "no-fields", action = ArgAction::SetTrue)]
    no_fields: bool,

    /// Emit JSON instead of a human-readable tree
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Hex-dump the raw bytes of unparsed (passthrough) atoms of this kind
    #[arg(long)]
    raw: Option<String>,

    /// Enable debugging output
    #[arg(short = 'D', long, action = ArgAction::SetTrue)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _logger =
        flexi_logger::Logger::try_with_str(if args.debug { "debug" } else { "warn" })?.start()?;

    let kinds = args.types.as_deref().map(parse_kinds).transpose()?;
    let registry = default_registry();

    for path in &args.paths {
        let mut f = File::open(path).with_context(|| format!("open {path}"))?;
        let mut diag = Diagnostics::new();
        let movie = Movie::read(&mut f, &registry, &mut diag);

        println!("[{path}]");

        let targets: Vec<AtomId> = match &kinds {
            Some(kinds) => movie.find(kinds),
            None => movie.roots().to_vec(),
        };

        if args.json {
            let out: Vec<JsonAtom> = targets.iter().map(|&id| build_json(&movie, id)).collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            for &id in &targets {
                print_atom(&movie, id, 0, !args.no_fields);
            }
        }

        if let Some(sel) = &args.raw {
            dump_raw(&mut f, &movie, sel)?;
        }

        for d in diag.entries() {
            eprintln!("{d}");
        }
    }

    Ok(())
}

fn parse_kinds(spec: &str) -> anyhow::Result<Vec<FourCC>> {
    spec.split(',')
        .map(|s| FourCC::from_str(s).with_context(|| format!("'{s}' is not a 4-byte kind")))
        .collect()
}

// ---------- Human-readable tree ----------

fn print_atom(movie: &Movie, id: AtomId, depth: usize, with_fields: bool) {
    let indent = "    ".repeat(depth);
    let node = movie.node(id);

    if node.is_passthrough() {
        println!("{indent}[{}] {}b (passthrough)", node.kind, movie.size_of(id));
    } else {
        println!("{indent}[{}] {}b", node.kind, movie.size_of(id));
        if with_fields {
            if let Some(fields) = node.fields() {
                for (name, value) in fields.iter() {
                    println!("{indent} | {name}={value}");
                }
            }
        }
    }

    for &child in node.children() {
        print_atom(movie, child, depth + 1, with_fields);
    }
}

// ---------- JSON representation ----------

#[derive(Serialize)]
struct JsonField {
    name: String,
    value: qtfile::Value,
}

#[derive(Serialize)]
struct JsonAtom {
    kind: String,
    size: u64,
    declared_size: u64,
    passthrough: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<JsonField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    children: Option<Vec<JsonAtom>>,
}

fn build_json(movie: &Movie, id: AtomId) -> JsonAtom {
    let node = movie.node(id);

    let fields = node.fields().map(|fields| {
        fields
            .iter()
            .map(|(name, value)| JsonField {
                name: name.to_string(),
                value: value.clone(),
            })
            .collect()
    });

    let children = if node.children().is_empty() {
        None
    } else {
        Some(
            node.children()
                .iter()
                .map(|&child| build_json(movie, child))
                .collect(),
        )
    };

    JsonAtom {
        kind: node.kind.to_string(),
        size: movie.size_of(id),
        declared_size: node.declared_size,
        passthrough: node.is_passthrough(),
        fields,
        children,
    }
}

// ---------- Raw dump ----------

fn dump_raw(f: &mut File, movie: &Movie, sel: &str) -> anyhow::Result<()> {
    let kind = FourCC::from_str(sel).with_context(|| format!("'{sel}' is not a 4-byte kind"))?;

    for (i, id) in movie.find(&[kind]).into_iter().enumerate() {
        if let AtomBody::Passthrough(span) = &movie.node(id).body {
            let data = read_slice(f, span.offset, span.len)?;
            println!("\n== Dump {i} ({kind}) offset={:#x}, len={} ==", span.offset, span.len);
            print!("{}", hex_dump(&data, span.offset));
        }
    }
    Ok(())
}
