//! Command implementations. Each returns the text to print.

use std::fs;
use std::path::Path;

use unsfs_core::codec::decode;
use unsfs_core::{
    AttributeRecord, AttributeResolver, BootstrapOptions, ConfigMap, ConnectionResolver,
    FilesystemBootstrap, KeyValues, ResolverConfig,
};
use unsfs_sys::{options_for_current_user, HostAttributes, LocalConnector};

use crate::{Cli, Command};

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Core(#[from] unsfs_core::Error),

    #[error("{0}")]
    Decode(#[from] unsfs_core::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected KEY=VALUE, got `{0}`")]
    Assignment(String),

    #[error("no namespace attribute `{name}` on {path}")]
    Unbound { path: String, name: String },
}

pub fn run(cli: &Cli) -> Result<String, CliError> {
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Command::Encode { pairs } => encode_pairs(pairs),
        Command::Decode { text, json } => decode_text(text, *json),
        Command::Bind { path, pairs } => bind(&config, path, pairs),
        Command::Inspect { path, record } => inspect(&config, path, *record),
        Command::Resolve { uri, define } => resolve(&config, uri, define),
        Command::Init {
            uri,
            define,
            root,
            create,
            user,
            working_dir,
        } => {
            let mut options = match user {
                Some(user) => BootstrapOptions::for_user(user.as_str()),
                None => options_for_current_user("root"),
            };
            options.working_dir = working_dir.clone();
            let connector = LocalConnector::new(root)?.create_missing(*create);
            init(&config, uri, define, connector, options)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ResolverConfig, CliError> {
    match path {
        Some(path) => {
            log::debug!("Loading resolver settings from {}", path.display());
            Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
        }
        None => Ok(ResolverConfig::default()),
    }
}

/// Split `KEY=VALUE` at the first `=`.
pub fn parse_assignment(arg: &str) -> Result<(String, String), CliError> {
    arg.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| CliError::Assignment(arg.to_string()))
}

fn parse_pairs(args: &[String]) -> Result<KeyValues, CliError> {
    args.iter().map(|arg| parse_assignment(arg)).collect()
}

pub fn encode_pairs(args: &[String]) -> Result<String, CliError> {
    Ok(parse_pairs(args)?.encode())
}

pub fn decode_text(text: &str, json: bool) -> Result<String, CliError> {
    let entries = decode(text)?;
    if json {
        return Ok(serde_json::to_string_pretty(&entries)?);
    }
    Ok(entries
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn bind(config: &ResolverConfig, path: &Path, args: &[String]) -> Result<String, CliError> {
    let entries = parse_pairs(args)?;
    let resolver = AttributeResolver::new(HostAttributes::new());
    resolver.bind(path, &config.attribute_name, &entries, config.max_attribute_len)?;
    Ok(entries.encode())
}

fn inspect(config: &ResolverConfig, path: &Path, record: bool) -> Result<String, CliError> {
    let resolver = AttributeResolver::new(HostAttributes::new());
    let entries = resolver
        .resolve_entries(
            path,
            &config.attribute_name,
            config.max_attribute_len,
            config.follow_symlink,
        )?
        .ok_or_else(|| CliError::Unbound {
            path: path.display().to_string(),
            name: config.attribute_name.clone(),
        })?;

    if record {
        let record = AttributeRecord::from_key_values(&entries)?;
        return Ok(serde_json::to_string_pretty(&record)?);
    }
    Ok(serde_json::to_string_pretty(&entries)?)
}

fn explicit_config(define: &[String]) -> Result<ConfigMap, CliError> {
    define.iter().map(|arg| parse_assignment(arg)).collect()
}

fn resolve(config: &ResolverConfig, uri: &str, define: &[String]) -> Result<String, CliError> {
    let resolver = ConnectionResolver::new(HostAttributes::new(), config.clone());
    let params = resolver.resolve(uri, &explicit_config(define)?)?;
    Ok(serde_json::to_string_pretty(&params)?)
}

fn init(
    config: &ResolverConfig,
    uri: &str,
    define: &[String],
    connector: LocalConnector,
    options: BootstrapOptions,
) -> Result<String, CliError> {
    let resolver = ConnectionResolver::new(HostAttributes::new(), config.clone());
    let params = resolver.resolve(uri, &explicit_config(define)?)?;

    let bootstrap = FilesystemBootstrap::new(connector, options);
    let mut handle = bootstrap.initialize(params)?;
    let summary = format!(
        "working directory: {}\npreload: {}",
        handle.qualified_working_directory(),
        if handle.is_preload_enabled() {
            "enabled"
        } else {
            "disabled"
        }
    );
    handle.close()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn assignment_splits_on_first_equals() {
        assert_eq!(
            parse_assignment("group=a=b").unwrap(),
            ("group".to_string(), "a=b".to_string())
        );
        assert!(matches!(
            parse_assignment("group"),
            Err(CliError::Assignment(_))
        ));
    }

    #[test]
    fn encode_escapes_values() {
        let text = encode_pairs(&args(&["group=daos_=:group", "pool=456"])).unwrap();
        assert_eq!(text, r"group=daos_\=\:group:pool=456");
    }

    #[test]
    fn decode_prints_lines() {
        let out = decode_text(r"group=a\:b\=1:pool=123", false).unwrap();
        assert_eq!(out, "group=a:b=1\npool=123");
    }

    #[test]
    fn decode_json() {
        let out = decode_text("pool=123", true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0][0], "pool");
        assert_eq!(value[0][1], "123");
    }

    #[test]
    fn resolve_direct_endpoint() {
        let cli = Cli::parse_from([
            "unsfs", "resolve", "daos://1234:56/", "-D", "pool=123", "-D", "cont=56",
        ]);
        let out = run(&cli).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["pool_id"], "123");
        assert_eq!(value["ranks"], "0");
    }

    #[test]
    fn resolve_reports_missing_pool() {
        let cli = Cli::parse_from(["unsfs", "resolve", "daos://1234:56/", "-D", "cont=56"]);
        let err = run(&cli).unwrap_err();
        assert!(err.to_string().contains("`pool`"));
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolver.json");
        fs::write(&path, r#"{"size_unit": "bytes"}"#).unwrap();

        let cli = Cli::parse_from([
            "unsfs",
            "--config",
            path.to_str().unwrap(),
            "resolve",
            "daos://1234:56/",
            "-D",
            "pool=1",
            "-D",
            "cont=2",
            "-D",
            "read_buffer_size=4096",
        ]);
        let value: serde_json::Value = serde_json::from_str(&run(&cli).unwrap()).unwrap();
        assert_eq!(value["read_buffer_size"], 4096);
    }

    #[test]
    fn init_creates_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from([
            "unsfs",
            "init",
            "daos://1234:56/",
            "-D",
            "pool=tank",
            "-D",
            "cont=set1",
            "-D",
            "preload_size=0",
            "--root",
            dir.path().to_str().unwrap(),
            "--create",
            "--user",
            "test",
        ]);
        let out = run(&cli).unwrap();
        assert!(out.contains("daos://1234:56/user/test"));
        assert!(out.contains("preload: disabled"));
        assert!(dir.path().join("tank/set1/user/test").is_dir());
    }

    #[test]
    fn verbosity_maps_to_level() {
        let cli = Cli::parse_from(["unsfs", "-vv", "decode", "a=1"]);
        assert_eq!(cli.log_level(), "trace");
    }
}
