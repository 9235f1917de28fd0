//! Host-side helper: `cargo run` builds the WASM bundle into `static/pkg`,
//! serves `static/` over HTTP, and optionally exposes it through ngrok.

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    harness::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod harness {
    use std::path::PathBuf;
    use std::process::{Command, Stdio};

    use anyhow::{bail, Context, Result};
    use clap::Parser;
    use tracing::{info, warn};
    use tracing_subscriber::EnvFilter;

    #[derive(Debug, Parser)]
    #[command(about = "Build and serve the image effect demo page")]
    struct Args {
        /// Port for the local HTTP server.
        #[arg(long, env = "SHADER_FX_PORT", default_value_t = 8000)]
        port: u16,

        /// Directory served as the site root; the bundle lands in `<dir>/pkg`.
        #[arg(long, default_value = "static")]
        static_dir: PathBuf,

        /// Serve whatever bundle is already there.
        #[arg(long)]
        skip_build: bool,

        /// Also start an ngrok tunnel to the server.
        #[arg(long)]
        tunnel: bool,
    }

    pub fn run() -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
        let args = Args::parse();

        if args.skip_build {
            info!("skipping wasm-pack build");
        } else {
            build_bundle(&args)?;
        }

        info!(
            dir = %args.static_dir.display(),
            "serving demo at http://127.0.0.1:{}",
            args.port
        );
        let mut server = Command::new("python3")
            .args(["-m", "http.server"])
            .arg(args.port.to_string())
            .arg("--directory")
            .arg(&args.static_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to start python3 http.server")?;

        let mut tunnel = None;
        if args.tunnel {
            match Command::new("ngrok")
                .args(["http", &args.port.to_string()])
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .spawn()
            {
                Ok(child) => {
                    info!("ngrok tunnel starting");
                    tunnel = Some(child);
                }
                Err(err) => warn!(%err, "ngrok not found, serving locally only"),
            }
        }

        let status = server.wait().context("http server did not exit cleanly")?;
        if let Some(mut child) = tunnel {
            let _ = child.kill();
        }
        if !status.success() {
            bail!("http server exited with {status}");
        }
        Ok(())
    }

    fn build_bundle(args: &Args) -> Result<()> {
        let out_dir = args.static_dir.join("pkg");
        info!(out_dir = %out_dir.display(), "building wasm bundle");
        let status = Command::new("wasm-pack")
            .args(["build", "--release", "--target", "web", "--out-dir"])
            .arg(&out_dir)
            .status()
            .context("wasm-pack not found in PATH (https://rustwasm.github.io/wasm-pack/)")?;
        if !status.success() {
            bail!("wasm-pack build failed with {status}");
        }
        Ok(())
    }
}
