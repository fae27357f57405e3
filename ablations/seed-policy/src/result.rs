use std::io::{self, Write};

use crate::profile::Profile;

const S4: &str = "    ";

fn sep() {
    println!("{}", "-".repeat(60));
}

fn describe_into<W: Write>(name: &str, p: &Profile, w: &mut W) -> io::Result<()> {
    writeln!(w, "Policy: {name}")?;
    match p.seed {
        Some((z, h, w_)) => writeln!(
            w,
            "{S4}seed: ({z}, {h}, {w_}), inside vessel: {}",
            p.seed_in_vessel
        )?,
        None => writeln!(w, "{S4}seed: none")?,
    }
    writeln!(
        w,
        "{S4}aorta mask: {} voxels, target reached: {}",
        p.aorta_voxels, p.aorta_converged
    )?;
    writeln!(w, "{S4}candidates: {} voxels", p.candidate_voxels)?;
    writeln!(
        w,
        "{S4}AIF patch: {} voxels, {:.1}% in vessel",
        p.patch_voxels,
        p.patch_precision * 100.0
    )?;
    writeln!(w, "{S4}curve peak: {:.3}", p.peak)?;
    writeln!(w, "{S4}elapsed: {:.3} ms", p.elapsed.as_secs_f64() * 1000.0)?;
    if let Some(e) = &p.error {
        writeln!(w, "{S4}error: {e}")?;
    }
    Ok(())
}

/// 各策略的运行记录.
pub struct AblationResult {
    data: Vec<(&'static str, Profile)>,
}

impl FromIterator<(&'static str, Profile)> for AblationResult {
    fn from_iter<I: IntoIterator<Item = (&'static str, Profile)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl AblationResult {
    /// 打印每个策略的记录.
    pub fn analyze(&self) {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        for (name, profile) in self.data.iter() {
            sep();
            describe_into(name, profile, &mut lock).expect("writing to stdout");
        }
        sep();
    }
}
