use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{exit, Command};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Binaries of `order_relay_lambda`, one deployed function each.
const LAMBDA_BINARIES: [&str; 5] = [
    "order_api",
    "put_item",
    "put_object",
    "presigned_url",
    "get_item",
];

const LAMBDA_PACKAGE: &str = "order_relay_lambda";
const DIST_DIR: &str = "target/lambda-dist";

/// Entry name the `provided.al2023` runtime executes.
const BOOTSTRAP: &str = "bootstrap";

type TaskResult = Result<(), String>;

#[derive(Parser)]
#[command(name = "xtask", about = "CI and Lambda packaging for the order relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a CI job
    Ci {
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Build every function binary and zip it as `bootstrap`
    ServerlessPackage {
        /// Lambda instruction set architecture
        #[arg(value_enum, long, default_value_t = LambdaArch::X86_64)]
        arch: LambdaArch,
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// fmt, clippy and tests
    Check,
    /// x86_64 release artifacts
    Package,
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum LambdaArch {
    #[value(name = "x86_64")]
    X86_64,
    Arm64,
}

impl LambdaArch {
    fn target_triple(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64-unknown-linux-gnu",
            Self::Arm64 => "aarch64-unknown-linux-gnu",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }
}

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn run_cargo(args: &[&str]) -> TaskResult {
    eprintln!("+ cargo {}", args.join(" "));
    let status = Command::new("cargo")
        .args(args)
        .status()
        .map_err(|error| format!("failed to execute cargo: {error}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!(
            "`cargo {}` exited with {}",
            args.first().copied().unwrap_or_default(),
            status.code().map_or("a signal".to_string(), |code| code.to_string())
        ))
    }
}

fn require_installed_target(triple: &str) -> TaskResult {
    let output = match Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
    {
        Ok(output) if output.status.success() => output,
        // Toolchains managed outside rustup: let cargo report the problem.
        _ => return Ok(()),
    };

    let installed = String::from_utf8_lossy(&output.stdout);
    if installed.lines().any(|line| line.trim() == triple) {
        Ok(())
    } else {
        Err(format!(
            "rust target `{triple}` is not installed; run `rustup target add {triple}`"
        ))
    }
}

fn build_functions(triple: &str, profile: BuildProfile) -> TaskResult {
    let mut args = vec!["build", "-p", LAMBDA_PACKAGE, "--target", triple];
    for bin in LAMBDA_BINARIES {
        args.extend(["--bin", bin]);
    }
    if matches!(profile, BuildProfile::Release) {
        args.push("--release");
    }
    run_cargo(&args)
}

fn zip_bootstrap(binary_path: &Path, zip_path: &Path) -> TaskResult {
    let binary = fs::read(binary_path)
        .map_err(|error| format!("cannot read '{}': {error}", binary_path.display()))?;
    let file = fs::File::create(zip_path)
        .map_err(|error| format!("cannot create '{}': {error}", zip_path.display()))?;

    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file(BOOTSTRAP, options)
        .map_err(|error| error.to_string())?;
    zip.write_all(&binary).map_err(|error| error.to_string())?;
    zip.finish().map_err(|error| error.to_string())?;
    Ok(())
}

fn package_functions(arch: LambdaArch, profile: BuildProfile) -> TaskResult {
    let triple = arch.target_triple();
    require_installed_target(triple)?;

    step(&format!("Build functions for {triple}"));
    build_functions(triple, profile)?;

    step("Zip bootstrap artifacts");
    let binaries: PathBuf = ["target", triple, profile.dir_name()].iter().collect();
    let dist = Path::new(DIST_DIR);
    fs::create_dir_all(dist).map_err(|error| format!("cannot create {DIST_DIR}: {error}"))?;

    for bin in LAMBDA_BINARIES {
        let zip_path = dist.join(format!("{bin}.zip"));
        zip_bootstrap(&binaries.join(bin), &zip_path)?;
        eprintln!("- {}", zip_path.display());
    }
    Ok(())
}

fn ci_check() -> TaskResult {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"])?;

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ])?;

    for package in ["order_relay_core", LAMBDA_PACKAGE] {
        step(&format!("Test {package}"));
        run_cargo(&["test", "-p", package])?;
    }
    Ok(())
}

fn run(command: Commands) -> TaskResult {
    match command {
        Commands::Ci { job } => {
            if matches!(job, CiJob::Check | CiJob::All) {
                ci_check()?;
            }
            if matches!(job, CiJob::Package | CiJob::All) {
                package_functions(LambdaArch::X86_64, BuildProfile::Release)?;
            }
            eprintln!("\nCI job passed.");
            Ok(())
        }
        Commands::ServerlessPackage { arch, profile } => package_functions(arch, profile),
    }
}

fn main() {
    if let Err(message) = run(Cli::parse().command) {
        eprintln!("error: {message}");
        exit(1);
    }
}
