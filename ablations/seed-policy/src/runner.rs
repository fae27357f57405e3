use std::thread;
use std::time::Instant;

use aif_berry::prelude::*;

use crate::phantom::Phantom;
use crate::profile::Profile;
use crate::result::AblationResult;

fn profile_policy(phantom: &Phantom, policy: Box<dyn SeedScorePolicy>) -> Profile {
    let start = Instant::now();
    let mut selector = AifSelector::with_policy(ExtractionParameters::default(), policy)
        .expect("default parameters are valid");
    selector.set_dynamics(phantom.series.clone());
    let outcome = selector
        .set_num_baseline(phantom.num_baseline)
        .and_then(|_| {
            let fraction = selector.params().min_fraction()?;
            selector.select_from_mask_auto(fraction)
        });
    Profile::collect(phantom, &selector, outcome, start.elapsed())
}

fn windowed(phantom: &Phantom) -> Profile {
    profile_policy(phantom, Box::new(WindowedScore))
}

fn additive(phantom: &Phantom) -> Profile {
    profile_policy(phantom, Box::new(AdditiveScore))
}

/// 并行运行每个策略, 汇总结果.
pub fn run() -> AblationResult {
    let phantom = Phantom::build();
    println!(
        "Running seed policy ablation on a {:?} phantom with {} time points...",
        phantom.series.dims(),
        phantom.series.nt()
    );

    thread::scope(|s| {
        let p = &phantom;
        let handles = [windowed, additive].map(|t| s.spawn(move || t(p)));
        AblationResult::from_iter(
            [WindowedScore.name(), AdditiveScore.name()]
                .into_iter()
                .zip(handles.map(|h| h.join().expect("Thread joining error"))),
        )
    })
}
