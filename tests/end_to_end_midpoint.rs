use std::path::Path;

use approx::assert_relative_eq;
use microscenario::core::aggregate::{AggregateTable, Aggregator, GroupKey};
use microscenario::core::delimited;
use microscenario::core::dimensions::DimensionSet;
use microscenario::core::naming::NamingScheme;
use microscenario::core::rescale::Scale;
use microscenario::core::reshape::Reshaper;
use microscenario::core::table::{TopicLookup, WideTable};

fn responses(p1: u32, p2: u32) -> WideTable {
    let mut text = String::from("participant_id");
    for topic in 1..=3 {
        for dim in 1..=2 {
            text.push_str(&format!(",a{topic}_matrix_{dim}"));
        }
    }
    text.push('\n');
    for (id, raw) in [("1", p1), ("2", p2)] {
        text.push_str(id);
        for _ in 0..6 {
            text.push_str(&format!(",{raw}"));
        }
        text.push('\n');
    }
    let path = Path::new("inline.csv");
    WideTable::from_records(delimited::parse(&text, ',', path).unwrap(), "participant_id", path)
        .unwrap()
}

fn topic_view(wide: &WideTable) -> microscenario::core::aggregate::TopicFactorTable {
    let scheme = NamingScheme::default();
    let dims = DimensionSet::risk_utility();
    let long = Reshaper::new(&scheme, &dims, Scale::default())
        .reshape(wide)
        .unwrap();
    let lookup = TopicLookup::generated(3);
    let aggregator = Aggregator {
        wide,
        scheme: &scheme,
        lookup: &lookup,
    };
    match aggregator.aggregate(&long, GroupKey::Topic) {
        AggregateTable::Topics(t) => t,
        AggregateTable::Users(_) => panic!("asked for topics"),
    }
}

#[test]
fn midpoint_everywhere_gives_zero_topic_means() {
    let topics = topic_view(&responses(4, 4));
    assert_eq!(topics.rows.len(), 3);
    for row in &topics.rows {
        for dim in ["risk", "utility"] {
            let s = row.stats[dim];
            assert_relative_eq!(s.mean.unwrap(), 0.0, epsilon = 1e-12);
            assert_relative_eq!(s.sd.unwrap(), 0.0, epsilon = 1e-12);
            assert_eq!(s.n, 2);
        }
    }
}

#[test]
fn symmetric_answers_give_zero_means_and_equal_sds() {
    let topics = topic_view(&responses(3, 5));
    let expected_sd = 2f64.sqrt() / 3.0;
    for row in &topics.rows {
        for dim in ["risk", "utility"] {
            let s = row.stats[dim];
            assert_relative_eq!(s.mean.unwrap(), 0.0, epsilon = 1e-12);
            assert_relative_eq!(s.sd.unwrap(), expected_sd, epsilon = 1e-12);
        }
        assert_eq!(row.short_label.as_deref(), Some(format!("T{}", row.topic_id).as_str()));
    }
}

#[test]
fn user_view_keeps_every_participant() {
    let wide = responses(3, 5);
    let scheme = NamingScheme::default();
    let dims = DimensionSet::risk_utility();
    let long = Reshaper::new(&scheme, &dims, Scale::default())
        .reshape(&wide)
        .unwrap();
    let lookup = TopicLookup::default();
    let aggregator = Aggregator {
        wide: &wide,
        scheme: &scheme,
        lookup: &lookup,
    };
    let AggregateTable::Users(users) = aggregator.aggregate(&long, GroupKey::Participant) else {
        panic!("asked for users");
    };
    assert_eq!(users.rows.len(), 2);
    let p1 = &users.rows[0];
    assert_eq!(p1.participant_id.as_str(), "1");
    assert_relative_eq!(p1.stats["utility"].mean.unwrap(), 1.0 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(p1.stats["risk"].mean.unwrap(), -1.0 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(p1.stats["risk"].sd.unwrap(), 0.0, epsilon = 1e-12);
}
