//! Launch the form example.

use anyhow::Result;
use arbor_examples::{
    form::create_app,
    headless::{Args, init_logging, run},
};
use clap::Parser;

/// Run the form example headless, writing a snapshot per step.
fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let h = run(create_app(), &args)?;
    print!("{}", h.dump()?);
    Ok(())
}
