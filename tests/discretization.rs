use microscenario::core::naming::NamingScheme;
use microscenario::core::rescale::Scale;
use microscenario::synthetic::correlation::CorrelationMatrix;
use microscenario::synthetic::sampler::{Rounding, SyntheticSampler, discretize};
use rand::{SeedableRng, rngs::StdRng};

#[test]
fn continuous_scores_discretize_to_scale_points() {
    let scale = Scale::default();
    let out: Vec<f64> = [-1.0, -0.5, 0.0, 0.5, 1.0]
        .into_iter()
        .map(|v| discretize(v, &scale, Rounding::default()))
        .collect();
    assert_eq!(out, vec![1.0, 2.0, 4.0, 6.0, 7.0]);
}

#[test]
fn sampled_columns_parse_back_through_naming_scheme() {
    let scheme = NamingScheme::default();
    let sampler = SyntheticSampler {
        scheme: &scheme,
        scale: Scale::default(),
        rounding: Rounding::HalfEven,
        id_column: "participant_id",
        covariate: None,
    };
    let wide = sampler
        .sample(
            &mut StdRng::seed_from_u64(3),
            5,
            25,
            &[0.0; 10],
            &[0.6; 10],
            &CorrelationMatrix::identity(10),
        )
        .unwrap();
    let keys = wide.evaluation_columns(&scheme);
    assert_eq!(keys.len(), 10);
    for (i, (idx, key)) in keys.iter().enumerate() {
        assert_eq!(*idx, i);
        assert_eq!(key.topic_id as usize, i / 2 + 1);
        assert_eq!(key.dimension_id as usize, i % 2 + 1);
    }
    assert!(wide.covariate_columns(&scheme).is_empty());
}
