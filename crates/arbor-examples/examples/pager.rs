//! Launch the pager example.

use anyhow::Result;
use arbor_examples::{
    headless::{Args, init_logging, run},
    pager::create_app,
};
use clap::Parser;

/// Run the pager example headless, writing a snapshot per step.
fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let h = run(create_app(), &args)?;
    print!("{}", h.dump()?);
    Ok(())
}
