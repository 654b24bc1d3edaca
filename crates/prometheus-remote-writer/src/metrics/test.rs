use super::*;
use crate::error::Error;
use crate::event::Event;
use assert_matches::assert_matches;

#[cfg(test)]
mod counter_tests {
    use super::*;

    #[test]
    fn test_counter_requires_name() {
        assert_matches!(Counter::named(""), Err(Error::MissingMetricName));
        assert_matches!(Counter::named("  "), Err(Error::MissingMetricName));
        assert_matches!(
            Gauge::new("", [("suite", "login")]),
            Err(Error::MissingMetricName)
        );
    }

    #[test]
    fn test_counter_starts_with_one_sample() {
        let counter = Counter::with_value("tests_total", Labels::new(), 3.0).unwrap();
        assert_eq!(counter.value(), 3.0);
        assert_eq!(counter.samples().len(), 1);
        assert_eq!(counter.samples()[0].value, 3.0);
    }

    #[test]
    fn test_counter_increment_appends_samples() {
        let mut counter = Counter::named("tests_total").unwrap();
        counter.inc().inc().inc_by(5.0);

        assert_eq!(counter.value(), 7.0);
        let values: Vec<f64> = counter.samples().iter().map(|s| s.value).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 7.0]);
        assert!(counter
            .samples()
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_counter_with_labels() {
        let mut counter = Counter::new("test", [("title", "login"), ("status", "passed")]).unwrap();
        counter.add_labels([("status", "failed"), ("retry", "1")]);

        let labels = counter.labels();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels["title"], "login");
        assert_eq!(labels["status"], "failed");
        assert_eq!(labels["retry"], "1");
    }

    #[test]
    fn test_reserved_label_is_ignored() {
        let mut counter = Counter::new("test", [(NAME_LABEL, "hijack")]).unwrap();
        counter.add_labels([(NAME_LABEL, "hijack"), ("ok", "yes")]);

        assert!(!counter.labels().contains_key(NAME_LABEL));
        let series = counter.to_timeseries();
        assert_eq!(series.name(), Some("test"));
        assert_eq!(series.labels["ok"], "yes");
    }
}

#[cfg(test)]
mod gauge_tests {
    use super::*;

    #[test]
    fn test_gauge_operations() {
        let mut gauge = Gauge::named("memory_free").unwrap();
        gauge.set(10.0).dec().dec_by(2.0).inc_by(0.5);
        assert_eq!(gauge.value(), 7.5);

        gauge.zero();
        assert_eq!(gauge.value(), 0.0);
        assert_eq!(gauge.samples().len(), 6);
    }

    #[test]
    fn test_retain_latest_keeps_newest_samples() {
        let mut gauge = Gauge::named("cpu_usage").unwrap();
        gauge.set(1.0).set(2.0).set(3.0);

        gauge.retain_latest(2);
        let values: Vec<f64> = gauge.samples().iter().map(|s| s.value).collect();
        assert_eq!(values, vec![2.0, 3.0]);
        assert_eq!(gauge.value(), 3.0);

        gauge.retain_latest(8);
        assert_eq!(gauge.samples().len(), 2);
    }
}

#[cfg(test)]
mod reset_tests {
    use super::*;

    #[test]
    fn test_reset_returns_fresh_metric() {
        let mut counter = Counter::with_value("test", [("suite", "auth")], 2.0).unwrap();
        counter.add_labels([("title", "logs in")]).inc().inc();

        let fresh = counter.reset();
        assert_eq!(fresh.value(), 2.0);
        assert_eq!(fresh.samples().len(), 1);
        assert_eq!(fresh.labels().len(), 1);
        assert_eq!(fresh.labels()["suite"], "auth");

        // the original keeps its series
        assert_eq!(counter.value(), 4.0);
        assert_eq!(counter.samples().len(), 3);
        assert_eq!(counter.labels()["title"], "logs in");

        let again = fresh.reset();
        assert_eq!(again.value(), fresh.value());
        assert_eq!(again.labels(), fresh.labels());
        assert_eq!(again.samples().len(), 1);
    }
}

#[cfg(test)]
mod collect_tests {
    use super::*;

    #[test]
    fn test_collect_writes_one_tagged_line() {
        let mut gauge = Gauge::new("fixture_gauge", [("case", "a")]).unwrap();
        gauge.set(4.0);

        let mut out = Vec::new();
        gauge.collect_into(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches('\n').count(), 1);
        assert!(text.ends_with('\n'));

        let payload = Event::parse(&text).expect("side channel line");
        assert_eq!(payload, gauge.to_timeseries());
    }

    #[test]
    fn test_scoped_collects_then_resets() {
        let mut out = Vec::new();
        let mut counter = Counter::named("scoped_counter").unwrap();
        {
            let mut scoped = counter.scoped_into(&mut out);
            scoped.inc().inc();
            assert_eq!(scoped.value(), 2.0);
        }

        let payload = Event::parse(std::str::from_utf8(&out).unwrap()).unwrap();
        assert_eq!(payload.samples.len(), 3);
        assert_eq!(counter.value(), 0.0);
        assert_eq!(counter.samples().len(), 1);
    }

    #[test]
    fn test_scoped_collects_on_panic() {
        let mut out = Vec::new();
        let mut gauge = Gauge::named("scoped_gauge").unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut scoped = gauge.scoped_into(&mut out);
            scoped.set(3.0);
            panic!("test body failed");
        }));
        assert!(result.is_err());

        let payload = Event::parse(std::str::from_utf8(&out).unwrap()).unwrap();
        assert_eq!(payload.samples.last().map(|s| s.value), Some(3.0));
        assert_eq!(gauge.samples().len(), 1);
    }
}

#[cfg(test)]
mod timeseries_tests {
    use super::*;

    #[test]
    fn test_relabel_prefixes_once() {
        let counter = Counter::new("tests_total", [("team", "qa")]).unwrap();
        let statics: Labels = [
            ("team".to_string(), "ignored".to_string()),
            ("env".to_string(), "ci".to_string()),
            (NAME_LABEL.to_string(), "ignored".to_string()),
        ]
        .into();

        for _ in 0..3 {
            let series = counter.to_timeseries().relabel("pw_", &statics);
            assert_eq!(series.name(), Some("pw_tests_total"));
            assert_eq!(series.labels["team"], "qa");
            assert_eq!(series.labels["env"], "ci");
        }
    }

    #[test]
    fn test_from_time() {
        let t = std::time::UNIX_EPOCH + std::time::Duration::from_millis(1_500);
        assert_eq!(from_time(t), 1_500);
        assert_eq!(from_time(std::time::UNIX_EPOCH), 0);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Inc(f64),
        Dec(f64),
        Set(f64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-1e6..1e6f64).prop_map(Op::Inc),
            (-1e6..1e6f64).prop_map(Op::Dec),
            (-1e6..1e6f64).prop_map(Op::Set),
        ]
    }

    proptest! {
        #[test]
        fn test_sample_count_and_value_follow_ops(
            initial in -1e6..1e6f64,
            ops in proptest::collection::vec(op(), 0..64),
        ) {
            let mut gauge = Gauge::with_value("prop", Labels::new(), initial).unwrap();
            let mut expected = initial;
            for op in &ops {
                match *op {
                    Op::Inc(v) => { gauge.inc_by(v); expected += v; }
                    Op::Dec(v) => { gauge.dec_by(v); expected -= v; }
                    Op::Set(v) => { gauge.set(v); expected = v; }
                }
            }
            prop_assert_eq!(gauge.samples().len(), 1 + ops.len());
            prop_assert_eq!(gauge.value(), expected);
            prop_assert_eq!(gauge.samples().last().map(|s| s.value), Some(expected));
        }

        #[test]
        fn test_labels_are_never_lost(
            batches in proptest::collection::vec(
                proptest::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..6),
                1..6,
            ),
        ) {
            let mut counter = Counter::named("prop").unwrap();
            let mut expected = Labels::new();
            for batch in &batches {
                counter.add_labels(batch.clone());
                counter.add_labels([(NAME_LABEL, "nope")]);
                expected.extend(batch.clone());
            }
            prop_assert_eq!(counter.labels(), &expected);
            let series = counter.to_timeseries();
            prop_assert_eq!(series.name(), Some("prop"));
        }

        #[test]
        fn test_reset_never_mutates(increments in 0usize..32) {
            let mut counter = Counter::named("prop").unwrap();
            for _ in 0..increments {
                counter.inc();
            }
            let before = counter.samples().to_vec();
            let fresh = counter.reset();
            prop_assert_eq!(counter.samples(), before.as_slice());
            prop_assert_eq!(fresh.samples().len(), 1);
            prop_assert_eq!(fresh.value(), 0.0);
        }
    }
}
