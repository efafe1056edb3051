use std::env;
use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use textindex::store::DEFAULT_INDEX_DIR;
use textindex::{AppState, Engine, IndexStore, Rebuild, Request, RequestError, router};
use textindex_dict::{DictionaryOptions, LoadMode, SourceEncoding};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_DICTIONARY: &str = "odict.csv";
const DEFAULT_DOCUMENTS_DIR: &str = ".";
const MAX_PROMPT_ATTEMPTS: usize = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config();
    info!(
        "using dictionary at {} ({:?}, {:?})",
        config.dictionary_path.display(),
        config.dictionary.encoding,
        config.dictionary.mode
    );
    info!("using index directory {}", config.index_dir.display());

    let engine = Engine::with_dictionary_file(
        &config.dictionary_path,
        config.dictionary.clone(),
        IndexStore::new(&config.index_dir),
    );

    match config.command {
        Command::Serve => serve(engine, &config).await,
        Command::Run(ref args) => run_once(&engine, args, config.rebuild),
    }
}

fn run_once(engine: &Engine, args: &[String], rebuild: Rebuild) -> anyhow::Result<()> {
    let request = if args.is_empty() {
        prompt_request()?
    } else {
        Request::from_args(args).inspect_err(|e| error!("{e}"))?
    };
    match engine.process_with(&request, rebuild) {
        Ok(result) => {
            println!("{result}");
            Ok(())
        }
        Err(err) => {
            error!("{err}");
            Err(err).with_context(|| format!("processing {}", request.document.display()))
        }
    }
}

/// Ask for a request on stdin, giving up after a bounded number of invalid answers.
fn prompt_request() -> anyhow::Result<Request> {
    let stdin = io::stdin();
    let mut last_error: Option<RequestError> = None;
    for attempt in 1..=MAX_PROMPT_ATTEMPTS {
        print!("request (<file.txt> <1|2|3> [data...]): ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            bail!("no request given");
        }
        let args: Vec<&str> = line.split_whitespace().collect();
        match Request::from_args(&args) {
            Ok(request) => return Ok(request),
            Err(err) => {
                warn!("attempt {attempt}/{MAX_PROMPT_ATTEMPTS}: {err}");
                eprintln!("{err}");
                last_error = Some(err);
            }
        }
    }
    match last_error {
        Some(err) => Err(err).context("too many invalid requests"),
        None => bail!("no request given"),
    }
}

async fn serve(engine: Engine, config: &Config) -> anyhow::Result<()> {
    info!("binding to {}:{}", config.host, config.port);
    info!("serving documents from {}", config.documents_dir.display());

    let state = AppState {
        engine: Arc::new(engine),
        documents_dir: config.documents_dir.clone(),
    };
    let app = router(state).layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid listen address")?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Clone)]
enum Command {
    Run(Vec<String>),
    Serve,
}

#[derive(Debug, Clone)]
struct Config {
    command: Command,
    dictionary_path: PathBuf,
    dictionary: DictionaryOptions,
    index_dir: PathBuf,
    rebuild: Rebuild,
    host: String,
    port: u16,
    documents_dir: PathBuf,
}

fn load_config() -> Config {
    parse_config(env::args().skip(1))
}

fn parse_config(mut args: impl Iterator<Item = String>) -> Config {
    let mut rebuild = Rebuild::IfMissing;
    let mut cli_dictionary: Option<PathBuf> = None;
    let mut cli_index_dir: Option<PathBuf> = None;
    let mut cli_encoding: Option<SourceEncoding> = None;
    let mut cli_mode: Option<LoadMode> = None;
    let mut cli_header = false;
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--rebuild" => rebuild = Rebuild::Always,
            "--dictionary-header" => cli_header = true,
            "--dictionary" => cli_dictionary = flag_path(&arg, args.next()),
            "--index-dir" => cli_index_dir = flag_path(&arg, args.next()),
            _ => {
                if let Some(path) = arg.strip_prefix("--dictionary=") {
                    cli_dictionary = Some(PathBuf::from(path));
                } else if let Some(path) = arg.strip_prefix("--index-dir=") {
                    cli_index_dir = Some(PathBuf::from(path));
                } else if let Some(enc) = arg.strip_prefix("--dictionary-encoding=") {
                    cli_encoding = flag_value("--dictionary-encoding", enc, parse_encoding);
                } else if let Some(mode) = arg.strip_prefix("--dictionary-mode=") {
                    cli_mode = flag_value("--dictionary-mode", mode, parse_load_mode);
                } else {
                    positional.push(arg);
                }
            }
        }
    }

    let command = if positional.first().map(String::as_str) == Some("serve") {
        Command::Serve
    } else {
        Command::Run(positional)
    };

    let dictionary_path = cli_dictionary
        .or_else(|| env::var("TEXTINDEX_DICTIONARY").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DICTIONARY));
    let encoding = cli_encoding
        .or_else(|| {
            env::var("TEXTINDEX_DICTIONARY_ENCODING")
                .ok()
                .and_then(|v| flag_value("TEXTINDEX_DICTIONARY_ENCODING", &v, parse_encoding))
        })
        .unwrap_or(SourceEncoding::Windows1251);
    let mode = cli_mode
        .or_else(|| {
            env::var("TEXTINDEX_DICTIONARY_MODE")
                .ok()
                .and_then(|v| flag_value("TEXTINDEX_DICTIONARY_MODE", &v, parse_load_mode))
        })
        .unwrap_or(LoadMode::Mmap);
    let has_header = cli_header
        || env::var("TEXTINDEX_DICTIONARY_HEADER")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
    let index_dir = cli_index_dir
        .or_else(|| env::var("TEXTINDEX_INDEX_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_DIR));

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let documents_dir = env::var("TEXTINDEX_DOCUMENTS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DOCUMENTS_DIR));

    Config {
        command,
        dictionary_path,
        dictionary: DictionaryOptions {
            mode,
            encoding,
            has_header,
        },
        index_dir,
        rebuild,
        host,
        port,
        documents_dir,
    }
}

fn flag_path(flag: &str, value: Option<String>) -> Option<PathBuf> {
    if value.is_none() {
        warn!("{flag} expects a path; using the default");
    }
    value.map(PathBuf::from)
}

fn flag_value<T>(name: &str, raw: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    let parsed = parse(raw);
    if parsed.is_none() {
        warn!("unrecognised {name} value {raw:?}; using the default");
    }
    parsed
}

fn parse_encoding(raw: &str) -> Option<SourceEncoding> {
    match raw.to_ascii_lowercase().as_str() {
        "utf8" | "utf-8" => Some(SourceEncoding::Utf8),
        "cp1251" | "windows-1251" => Some(SourceEncoding::Windows1251),
        _ => None,
    }
}

fn parse_load_mode(raw: &str) -> Option<LoadMode> {
    match raw.to_ascii_lowercase().as_str() {
        "mmap" => Some(LoadMode::Mmap),
        "owned" => Some(LoadMode::Owned),
        _ => None,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|a| a.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn flags_are_separated_from_the_request() {
        let config = parse_config(args(&[
            "--rebuild",
            "--dictionary",
            "dict.csv",
            "--index-dir=out",
            "--dictionary-encoding=utf8",
            "--dictionary-mode=owned",
            "story.txt",
            "1",
        ]));
        assert_eq!(config.rebuild, Rebuild::Always);
        assert_eq!(config.dictionary_path, PathBuf::from("dict.csv"));
        assert_eq!(config.index_dir, PathBuf::from("out"));
        assert_eq!(config.dictionary.encoding, SourceEncoding::Utf8);
        assert_eq!(config.dictionary.mode, LoadMode::Owned);
        assert!(matches!(config.command, Command::Run(ref a) if a == &["story.txt", "1"]));
    }

    #[test]
    fn unrecognised_values_are_rejected() {
        assert_eq!(flag_value("--dictionary-encoding", "utf-8x", parse_encoding), None);
        assert_eq!(flag_value("--dictionary-mode", "lazy", parse_load_mode), None);
        assert_eq!(
            flag_value("--dictionary-encoding", "Windows-1251", parse_encoding),
            Some(SourceEncoding::Windows1251)
        );
    }

    #[test]
    fn trailing_path_flag_is_not_taken_as_a_request() {
        assert_eq!(flag_path("--dictionary", None), None);
        let config = parse_config(args(&["serve", "--dictionary"]));
        assert!(matches!(config.command, Command::Serve));
    }
}
