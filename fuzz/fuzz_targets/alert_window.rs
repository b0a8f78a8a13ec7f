#![no_main]

use arbitrary::Arbitrary;
use httpmon_log_pipeline::{AlertWindow, TransitionKind};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    window_secs: u16,
    threshold: u8,
    steps: Vec<Step>,
}

#[derive(Arbitrary, Debug)]
enum Step {
    Record(i64),
    Evaluate(i64),
    Observe(i64),
}

fuzz_target!(|input: FuzzInput| {
    let Ok(mut window) = AlertWindow::new(u64::from(input.window_secs), u64::from(input.threshold))
    else {
        return;
    };
    let max_hits = u64::from(input.threshold) * u64::from(input.window_secs);
    let mut alert_count = 0;

    for step in input.steps.into_iter().take(512) {
        let transition = match step {
            Step::Record(ts) => {
                window.record(ts);
                continue;
            }
            Step::Evaluate(now) => window.evaluate(now),
            Step::Observe(ts) => window.observe(ts),
        };

        // after an evaluation the state always matches the retained count
        assert_eq!(window.is_alerted(), window.window_hits() > max_hits);

        match transition.map(|t| t.kind) {
            Some(TransitionKind::Alert) => alert_count += 1,
            Some(TransitionKind::Recovered) | None => {}
        }
        assert_eq!(window.alert_count(), alert_count);
    }
});
