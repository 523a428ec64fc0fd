use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use memedit::config::{validate_config, Config, ConfigLoader, DEFAULT_CONFIG_FILE};
use memedit::memory::MemoryAccessor;
use memedit::process::{ModuleDirectory, ProcessDirectory};
use memedit::system::{Scenario, SystemApi};
use memedit::{Address, OffsetChain, ProcessId, ScalarType, ScalarValue};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "memedit", version)]
#[command(about = "Read and write the memory of another process", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./memedit.toml when present)
    #[arg(long, global = true, env = "MEMEDIT_CONFIG")]
    config: Option<PathBuf>,

    /// Run against a simulated system described by a TOML scenario
    #[arg(long, global = true, env = "MEMEDIT_SCENARIO")]
    simulate: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the id of the first process with the given executable name
    Pid {
        /// Exact executable name, e.g. "game.exe"
        name: String,
    },

    /// List running processes
    Ps,

    /// List the modules loaded in a process
    Modules {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print the base address of a module
    ModuleBase {
        #[command(flatten)]
        target: TargetArgs,

        /// Exact module name, e.g. "client.dll"
        module: String,
    },

    /// Resolve a pointer chain to its final address
    Resolve {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        location: LocationArgs,
    },

    /// Read a typed value
    Read {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        location: LocationArgs,
    },

    /// Write a typed value
    Write {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        location: LocationArgs,

        /// Value to write; must fit the scalar type exactly
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Read raw bytes and print them as hex
    ReadBytes {
        #[command(flatten)]
        target: TargetArgs,

        /// Start address (hex with 0x or $ prefix, or decimal)
        address: String,

        /// Number of bytes to read
        size: usize,

        /// Treat ADDRESS as relative to this module's base
        #[arg(short, long)]
        module: Option<String>,
    },

    /// Write raw bytes given as hex
    WriteBytes {
        #[command(flatten)]
        target: TargetArgs,

        /// Start address (hex with 0x or $ prefix, or decimal)
        address: String,

        /// Bytes to write, e.g. "90 90 e8" or "9090e8"
        bytes: String,

        /// Treat ADDRESS as relative to this module's base
        #[arg(short, long)]
        module: Option<String>,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct TargetArgs {
    /// Target process executable name
    #[arg(short, long)]
    process: Option<String>,

    /// Target process id
    #[arg(long)]
    pid: Option<ProcessId>,
}

#[derive(Args)]
struct LocationArgs {
    /// Address, or the chain's base address when --offsets is given
    address: String,

    /// Scalar type: i8..i64, u8..u64, f32, f64 or aliases such as int, float, dword
    #[arg(short = 't', long = "type")]
    scalar_type: Option<String>,

    /// Treat ADDRESS as relative to this module's base
    #[arg(short, long)]
    module: Option<String>,

    /// Pointer chain offsets, comma separated, e.g. "0x10,0x20,-0x8"
    #[arg(short, long, allow_hyphen_values = true)]
    offsets: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging.level);
    debug!(?config, "loaded configuration");

    let api = open_system(cli.simulate.as_deref(), &config)?;
    run(cli.command, api, &config, cli.json)
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let loader = ConfigLoader::new(path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE)));
    let config = match path {
        Some(_) => loader.load(),
        None => loader.load_or_default(),
    }
    .with_context(|| format!("loading {}", loader.path().display()))?;
    validate_config(&config).context("validating configuration")?;
    Ok(config)
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn open_system(simulate: Option<&Path>, config: &Config) -> Result<Arc<dyn SystemApi>> {
    let scenario = simulate.or(config.simulation.scenario.as_deref());
    match scenario {
        Some(path) => {
            let scenario = Scenario::from_file(path)
                .with_context(|| format!("loading scenario {}", path.display()))?;
            info!(
                path = %path.display(),
                processes = scenario.processes.len(),
                "using simulated system"
            );
            Ok(Arc::new(scenario.build()?))
        }
        None => native_system(),
    }
}

#[cfg(windows)]
fn native_system() -> Result<Arc<dyn SystemApi>> {
    Ok(memedit::system::native())
}

#[cfg(not(windows))]
fn native_system() -> Result<Arc<dyn SystemApi>> {
    bail!("native process access is only available on Windows; pass --simulate <scenario.toml>")
}

fn run(command: Commands, api: Arc<dyn SystemApi>, config: &Config, json: bool) -> Result<()> {
    match command {
        Commands::Pid { name } => {
            let pid = ProcessDirectory::new(api).find_process_id(&name)?;
            emit(json, &json!({ "name": name, "pid": pid }), || pid.to_string())
        }
        Commands::Ps => {
            let processes = ProcessDirectory::new(api).processes()?;
            emit(json, &processes, || {
                let mut out = format!("{:>8} {:>8} {:>7}  NAME", "PID", "PPID", "THREADS");
                for p in &processes {
                    out.push_str(&format!(
                        "\n{:>8} {:>8} {:>7}  {}",
                        p.pid, p.parent_pid, p.thread_count, p.name
                    ));
                }
                out
            })
        }
        Commands::Modules { target } => {
            let pid = target_pid(&api, &target)?;
            let modules = ModuleDirectory::new(api).modules(pid)?;
            emit(json, &modules, || {
                let mut out = format!("{:<18} {:>10}  NAME", "BASE", "SIZE");
                for m in &modules {
                    out.push_str(&format!(
                        "\n{} {:>#10x}  {}",
                        m.base_address, m.size, m.name
                    ));
                }
                out
            })
        }
        Commands::ModuleBase { target, module } => {
            let pid = target_pid(&api, &target)?;
            let base = ModuleDirectory::new(api).find_module_base(pid, &module)?;
            emit(
                json,
                &json!({ "pid": pid, "module": module, "base": base.to_string() }),
                || base.to_string(),
            )
        }
        Commands::Resolve { target, location } => {
            let accessor = open_accessor(&api, &target)?;
            let offsets = parse_offsets(&location)?
                .ok_or_else(|| anyhow!("resolve needs --offsets"))?;
            let base = base_address(&accessor, &location.address, location.module.as_deref())?;
            let address = accessor.resolve(base, offsets.as_slice())?;
            accessor.close().context("closing process handle")?;
            emit(
                json,
                &json!({ "base": base.to_string(), "offsets": offsets, "address": address.to_string() }),
                || address.to_string(),
            )
        }
        Commands::Read { target, location } => {
            let accessor = open_accessor(&api, &target)?;
            let (address, value) = {
                let slot = build_location(&accessor, &location, config)?.resolved()?;
                (slot.address()?, slot.read()?)
            };
            accessor.close().context("closing process handle")?;
            emit(
                json,
                &json!({ "address": address.to_string(), "value": value }),
                || value.to_string(),
            )
        }
        Commands::Write {
            target,
            location,
            value,
        } => {
            let accessor = open_accessor(&api, &target)?;
            let (address, value, written) = {
                let slot = build_location(&accessor, &location, config)?;
                let value = ScalarValue::parse(&value, slot.scalar_type())?;
                let slot = slot.resolved()?;
                (slot.address()?, value, slot.write(value)?)
            };
            accessor.close().context("closing process handle")?;
            emit(
                json,
                &json!({ "address": address.to_string(), "value": value, "written": written }),
                || format!("wrote {} ({} bytes) at {}", value, written, address),
            )
        }
        Commands::ReadBytes {
            target,
            address,
            size,
            module,
        } => {
            if size > config.memory.max_read_size {
                bail!(
                    "read of {} bytes exceeds memory.max_read_size ({})",
                    size,
                    config.memory.max_read_size
                );
            }
            let accessor = open_accessor(&api, &target)?;
            let address = base_address(&accessor, &address, module.as_deref())?;
            let bytes = accessor.read_bytes(address, size)?;
            accessor.close().context("closing process handle")?;
            let encoded = hex::encode(&bytes);
            emit(
                json,
                &json!({
                    "address": address.to_string(),
                    "requested": size,
                    "read": bytes.len(),
                    "bytes": encoded,
                }),
                || encoded.clone(),
            )
        }
        Commands::WriteBytes {
            target,
            address,
            bytes,
            module,
        } => {
            let data = parse_hex(&bytes)?;
            let accessor = open_accessor(&api, &target)?;
            let address = base_address(&accessor, &address, module.as_deref())?;
            let written = accessor.write_bytes(address, &data)?;
            accessor.close().context("closing process handle")?;
            emit(
                json,
                &json!({ "address": address.to_string(), "requested": data.len(), "written": written }),
                || format!("wrote {} of {} bytes at {}", written, data.len(), address),
            )
        }
    }
}

fn emit<T>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()>
where
    T: Serialize + ?Sized,
{
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

fn target_pid(api: &Arc<dyn SystemApi>, target: &TargetArgs) -> Result<ProcessId> {
    match (target.pid, target.process.as_deref()) {
        (Some(pid), _) => Ok(pid),
        (None, Some(name)) => ProcessDirectory::new(Arc::clone(api))
            .find_process_id(name)
            .with_context(|| format!("looking up process {}", name)),
        (None, None) => bail!("either --process or --pid is required"),
    }
}

fn open_accessor(api: &Arc<dyn SystemApi>, target: &TargetArgs) -> Result<MemoryAccessor> {
    let pid = target_pid(api, target)?;
    MemoryAccessor::open(Arc::clone(api), pid).with_context(|| format!("opening process {}", pid))
}

fn base_address(
    accessor: &MemoryAccessor,
    address: &str,
    module: Option<&str>,
) -> Result<Address> {
    let address: Address = address.parse()?;
    match module {
        Some(module) => {
            let base = accessor.module_base(module)?;
            base.checked_add(address.as_usize())
                .ok_or_else(|| anyhow!("{} + {} overflows", base, address))
        }
        None => Ok(address),
    }
}

fn parse_offsets(location: &LocationArgs) -> Result<Option<OffsetChain>> {
    Ok(location
        .offsets
        .as_deref()
        .map(str::parse::<OffsetChain>)
        .transpose()?)
}

fn build_location<'a>(
    accessor: &'a MemoryAccessor,
    location: &LocationArgs,
    config: &Config,
) -> Result<memedit::memory::MemoryLocation<'a>> {
    let scalar_type = match location.scalar_type.as_deref() {
        Some(name) => name.parse::<ScalarType>()?,
        None => config.default_type()?,
    };
    let base = base_address(accessor, &location.address, location.module.as_deref())?;
    let offsets = parse_offsets(location)?.map(|chain| chain.as_slice().to_vec());
    Ok(accessor.location(scalar_type, base, offsets)?)
}

fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    hex::decode(&digits).with_context(|| format!("invalid hex bytes: {}", text))
}
