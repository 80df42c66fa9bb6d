//! webroot-bridge - serve a module's webroot to a local renderer
//!
//! Usage:
//!   webroot-bridge [--config <file>] [--root <dir> | --module <id>] [--port <n>]
//!
//! The bridge will:
//! 1. Load the configuration (file, `WEBROOT__*` environment, flags)
//! 2. Open files through an elevated shell unless `--local` is given
//! 3. Serve the directory on 127.0.0.1 behind a session token

use std::path::PathBuf;

use anyhow::Context;
use webroot_bridge::asset::Insets;
use webroot_bridge::channel::{self, ChannelConfig, ChannelKind, SuShellChannel};
use webroot_bridge::logging::{self, LogLevel, LoggingSystem};
use webroot_bridge::bridge::MODULES_ROOT;
use webroot_bridge::{
    BridgeConfig, ConfigLoader, ModuleWebRoot, PrivilegedFileBridge, WebRootError, WebRootServer,
};

/// Command line arguments
struct Args {
    /// Explicit configuration file
    config: Option<PathBuf>,
    /// Directory to serve
    root: Option<PathBuf>,
    /// Module whose webroot is served
    module: Option<ModuleWebRoot>,
    /// Port override
    port: Option<u16>,
    /// Window insets override
    insets: Option<Insets>,
    /// Use the process's own file access instead of `su`
    local: bool,
    /// Enable verbose logging
    verbose: bool,
    /// Print the effective configuration and exit
    print_config: bool,
}

impl Args {
    fn parse() -> Result<Self, String> {
        let mut args = std::env::args().skip(1);
        let mut parsed = Self {
            config: None,
            root: None,
            module: None,
            port: None,
            insets: None,
            local: false,
            verbose: false,
            print_config: false,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let path = args.next().ok_or("--config needs a path")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--root" | "-r" => {
                    let dir = args.next().ok_or("--root needs a directory")?;
                    parsed.root = Some(PathBuf::from(dir));
                }
                "--module" | "-m" => {
                    let id = args.next().ok_or("--module needs an id")?;
                    parsed.module = Some(ModuleWebRoot::new(id).map_err(|e| e.to_string())?);
                }
                "--port" | "-p" => {
                    let val = args.next().ok_or("--port needs a value")?;
                    parsed.port = Some(val.parse().map_err(|_| "Invalid port value")?);
                }
                "--insets" => {
                    let val = args.next().ok_or("--insets needs top,bottom,left,right")?;
                    parsed.insets = Some(val.parse()?);
                }
                "--local" | "-l" => {
                    parsed.local = true;
                }
                "--verbose" | "-v" => {
                    parsed.verbose = true;
                }
                "--print-config" => {
                    parsed.print_config = true;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {
                    return Err(format!("Unknown argument: {}", arg));
                }
            }
        }

        if parsed.root.is_some() && parsed.module.is_some() {
            return Err("--root and --module are mutually exclusive".to_string());
        }

        Ok(parsed)
    }

    /// Fold the flags over the loaded configuration
    fn apply(&self, config: &mut BridgeConfig) {
        if let Some(root) = &self.root {
            config.base_directory = root.clone();
        }
        if let Some(module) = &self.module {
            config.base_directory = module.webroot();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(insets) = self.insets {
            config.server.insets = insets;
        }
        if self.local {
            config.channel = ChannelConfig {
                serialize: config.channel.serialize,
                ..ChannelConfig::local()
            };
        }
        if self.verbose {
            config.logging.level = LogLevel::Debug;
        }
    }
}

fn print_help() {
    println!(
        r#"webroot-bridge - Privileged webroot server

USAGE:
    webroot-bridge [OPTIONS]

OPTIONS:
    -c, --config <FILE>    Configuration file (TOML, JSON or YAML)
    -r, --root <DIR>       Directory to serve
    -m, --module <ID>      Serve {modules}/<ID>/webroot unless the module is
                           disabled, pending update or removal, or has no
                           index.html
    -p, --port <N>         Port to listen on (127.0.0.1 only)
        --insets <T,B,L,R> Window insets in pixels for internal/insets.css
    -l, --local            Read files without elevation
    -v, --verbose          Enable verbose logging
        --print-config     Print the effective configuration and exit
    -h, --help             Print this help message

ENVIRONMENT:
    WEBROOT__BASE_DIRECTORY, WEBROOT__SERVER__PORT, WEBROOT__CHANNEL__PROGRAM, ...
    override the matching configuration keys.

DESCRIPTION:
    Every request is resolved inside the served directory before any file is
    opened. Requests escaping the directory, and files that do not exist,
    are answered with the same empty 404. Directories under /data/data and
    /data/system cannot be served.
"#,
        modules = MODULES_ROOT
    );
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_file(path);
    }
    let mut config = loader
        .load()
        .map_err(WebRootError::from)
        .context("Failed to load configuration")?;
    args.apply(&mut config);

    if args.print_config {
        let json = config.to_json_pretty().map_err(WebRootError::from)?;
        println!("{}", json);
        return Ok(());
    }

    config
        .validate()
        .map_err(WebRootError::from)
        .context("Invalid configuration")?;

    // Keep the logging system alive so the file writer is flushed on exit
    let logging_system = match LoggingSystem::init(config.logging.clone()) {
        Ok(system) => Some(system),
        Err(e) => {
            eprintln!("Failed to initialize logging system: {}. Using basic logging.", e);
            tracing_subscriber::fmt()
                .with_max_level(config.logging.level.to_tracing_level())
                .with_writer(std::io::stderr)
                .try_init()
                .ok();
            None
        }
    };
    let _rotation_task = logging_system
        .as_ref()
        .and_then(|system| system.spawn_rotation_task(logging::ROTATION_CHECK_INTERVAL));

    if config.channel.kind == ChannelKind::Su {
        let elevation = SuShellChannel::new(
            config.channel.program.clone(),
            config.channel.args.clone(),
        );
        match elevation.check_elevation().await {
            Ok(true) => tracing::info!("Elevation through {} confirmed", elevation.program()),
            Ok(false) => tracing::warn!(
                "{} does not run as root; privileged files will be reported missing",
                elevation.program()
            ),
            Err(e) => tracing::warn!(
                "Elevation check through {} failed: {}",
                elevation.program(),
                e
            ),
        }
    }

    let channel = channel::connect(&config.channel);

    // Disabled modules and modules with a pending update or removal stay dark
    if let Some(module) = &args.module {
        module
            .check_servable(&*channel)
            .await
            .map_err(WebRootError::from)
            .with_context(|| format!("Refusing to serve module {}", module.id()))?;
    }

    let bridge = PrivilegedFileBridge::new(&config.base_directory, channel)
        .map_err(WebRootError::from)
        .with_context(|| format!("Cannot serve {}", config.base_directory.display()))?;

    let server = WebRootServer::new(std::sync::Arc::new(bridge), config.server.clone());
    println!("{}", server.entry_url("index.html"));

    let handle = server.start_background();

    tokio::select! {
        result = handle => {
            result
                .context("Server task failed")?
                .map_err(WebRootError::from)
                .context("Server stopped")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(64); // EX_USAGE
        }
    };

    if let Err(e) = run(args).await {
        tracing::error!("webroot-bridge failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<WebRootError>()
            .map(WebRootError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
