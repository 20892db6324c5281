use eyre::Result;
use seirv::prelude::*;

fn main() -> Result<()> {
    let settings = Settings::from_file("demos/dengue/config.toml")?;
    let trajectory = run(settings)?;

    if let Some((time, peak)) = trajectory.peak(Compartment::I) {
        println!("Infectious humans peak at day {:.1} with {:.0} cases", time, peak);
    }
    Ok(())
}
