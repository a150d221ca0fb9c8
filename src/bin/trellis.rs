use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sha2::Digest as _;

#[derive(Parser, Debug)]
#[command(name = "trellis", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a stored page against a collection store and print the result as JSON.
    Resolve(ResolveArgs),
    /// Validate a stored page document.
    Validate(ValidateArgs),
}

#[derive(Parser, Debug)]
struct ResolveArgs {
    /// Page document JSON (`{layers, components}`).
    #[arg(long)]
    layers: PathBuf,

    /// Collection store JSON (`{draft, published}`).
    #[arg(long)]
    store: PathBuf,

    /// Read published data instead of drafts.
    #[arg(long, default_value_t = false)]
    published: bool,

    /// Page shown by every paginated list without its own `--layer-page`.
    #[arg(long)]
    page: Option<usize>,

    /// Page for one paginated list, as `LAYER_ID=N`. Repeatable.
    #[arg(long = "layer-page", value_parser = parse_layer_page)]
    layer_pages: Vec<(String, usize)>,

    /// Bind the page to a CMS item, as `COLLECTION_ID/ITEM_ID`.
    #[arg(long = "page-item", value_parser = parse_page_item)]
    page_item: Option<(String, String)>,

    /// Resolve on the calling thread only.
    #[arg(long, default_value_t = false)]
    sequential: bool,

    /// Override rayon worker threads.
    #[arg(long)]
    threads: Option<usize>,

    /// Output path; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print the SHA-256 of the output JSON to stderr.
    #[arg(long, default_value_t = false)]
    digest: bool,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Page document JSON.
    #[arg(long)]
    layers: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Resolve(args) => cmd_resolve(args),
        Command::Validate(args) => cmd_validate(args),
    }
}

fn cmd_resolve(args: ResolveArgs) -> anyhow::Result<()> {
    let doc = trellis::PageDocument::from_path(&args.layers)?;
    let source = trellis::InMemorySource::from_path(&args.store)?;

    let mut pagination = trellis::PaginationContext::new();
    pagination.default_page = args.page;
    for (layer_id, page) in args.layer_pages {
        pagination = pagination.with_page(layer_id, page);
    }

    let mut req = doc
        .into_request()
        .published(args.published)
        .with_pagination(pagination);
    if let Some((collection_id, item_id)) = args.page_item {
        req = req.with_page_item(collection_id, item_id);
    }

    let opts = trellis::ResolveOpts {
        parallel: !args.sequential,
        threads: args.threads,
        ..trellis::ResolveOpts::default()
    };
    let log = trellis::RecordingLog::new();
    let page = trellis::Resolver::new(&source, opts)
        .with_log(&log)
        .resolve_page(&req)?;

    for w in log.take() {
        eprintln!("warning: {}", serde_json::to_string(&w)?);
    }

    let mut json = serde_json::to_vec_pretty(&page).context("serialize resolved page")?;
    json.push(b'\n');

    match &args.out {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::write(path, &json)
                .with_context(|| format!("write output '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => std::io::stdout()
            .lock()
            .write_all(&json)
            .context("write stdout")?,
    }

    if args.digest {
        eprintln!("sha256: {}", sha256_hex(&json));
    }
    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let doc = trellis::PageDocument::from_path(&args.layers)?;
    eprintln!(
        "ok: {} top-level layers, {} components",
        doc.layers.len(),
        doc.components.len()
    );
    Ok(())
}

fn parse_layer_page(s: &str) -> Result<(String, usize), String> {
    let (id, page) = s
        .split_once('=')
        .ok_or_else(|| format!("expected LAYER_ID=N, got '{s}'"))?;
    if id.trim().is_empty() {
        return Err("layer id must be non-empty".to_owned());
    }
    let page = page
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid page number '{page}': {e}"))?;
    Ok((id.trim().to_owned(), page))
}

fn parse_page_item(s: &str) -> Result<(String, String), String> {
    match s.split_once('/') {
        Some((c, i)) if !c.trim().is_empty() && !i.trim().is_empty() => {
            Ok((c.trim().to_owned(), i.trim().to_owned()))
        }
        _ => Err(format!("expected COLLECTION_ID/ITEM_ID, got '{s}'")),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
