use std::collections::HashMap;

use crate::models::{
    clamp_confidence, AnalyzedRepository, DetectionSource, TechnologyCategory, TechnologyDetection,
    TechnologyProfile,
};

/// Scales every confidence by `factor`, tags the evidence source and the
/// repository it came from.
pub fn apply_weight(
    mut profile: TechnologyProfile,
    factor: f32,
    source: DetectionSource,
    repository: &str,
) -> TechnologyProfile {
    for detection in profile.iter_mut() {
        detection.confidence = clamp_confidence(detection.confidence * factor);
        detection.source = source;
        detection.repository_source = Some(repository.to_string());
    }
    profile
}

/// Combines file-derived and metadata-derived detections for one
/// repository. Duplicates keep the higher confidence; on a tie the
/// file-derived entry wins.
pub fn merge_weighted(file: TechnologyProfile, metadata: TechnologyProfile) -> TechnologyProfile {
    let mut merged = file;
    merged.merge_max(metadata);
    merged
}

/// User-level profile: per category and name, the maximum confidence seen
/// in any repository, together with every repository that reported it.
/// Entries whose maximum is below `threshold` are dropped.
pub fn aggregate_profiles(repositories: &[AnalyzedRepository], threshold: f32) -> TechnologyProfile {
    let mut aggregated = TechnologyProfile::default();

    for category in TechnologyCategory::ALL {
        let mut by_name: HashMap<String, TechnologyDetection> = HashMap::new();

        for repo in repositories {
            for detection in repo.technologies.category(category) {
                let entry = by_name.entry(detection.key()).or_insert_with(|| TechnologyDetection {
                    repositories: Vec::new(),
                    ..detection.clone()
                });

                if detection.confidence > entry.confidence {
                    entry.name = detection.name.clone();
                    entry.confidence = detection.confidence;
                    entry.source = detection.source;
                    entry.repository_source = detection.repository_source.clone();
                }
                if !entry.repositories.contains(&repo.full_name) {
                    entry.repositories.push(repo.full_name.clone());
                }
            }
        }

        let mut kept: Vec<TechnologyDetection> = by_name
            .into_values()
            .filter(|d| d.confidence >= threshold)
            .collect();
        sort_detections(&mut kept);
        *aggregated.category_mut(category) = kept;
    }

    aggregated
}

/// Highest confidence first, then alphabetical.
pub fn sort_detections(detections: &mut [TechnologyDetection]) {
    detections.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.key().cmp(&b.key()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(name: &str, confidence: f32, source: DetectionSource) -> TechnologyDetection {
        TechnologyDetection::new(name, confidence, source)
    }

    fn repo(full_name: &str, technologies: TechnologyProfile) -> AnalyzedRepository {
        AnalyzedRepository {
            name: full_name.rsplit('/').next().unwrap().to_string(),
            full_name: full_name.to_string(),
            description: None,
            url: String::new(),
            size: 100,
            attributed_commits: 1,
            files_analyzed: 0,
            technologies,
        }
    }

    #[test]
    fn test_apply_weight_scales_and_tags() {
        let mut profile = TechnologyProfile::default();
        profile.frameworks.push(detection("express", 0.5, DetectionSource::File));
        profile.databases.push(detection("postgres", 1.0, DetectionSource::File));

        let weighted = apply_weight(profile, 0.8, DetectionSource::File, "octo/api");
        assert!((weighted.frameworks[0].confidence - 0.4).abs() < 1e-6);
        assert!((weighted.databases[0].confidence - 0.8).abs() < 1e-6);
        assert_eq!(weighted.databases[0].repository_source.as_deref(), Some("octo/api"));
        assert!(weighted.iter().all(|(_, d)| (0.0..=1.0).contains(&d.confidence)));
    }

    #[test]
    fn test_weighting_never_leaves_unit_interval() {
        for raw in [0.0f32, 0.3, 0.99, 1.0] {
            for factor in [0.3f32, 0.6, 0.8, 1.5] {
                let mut profile = TechnologyProfile::default();
                profile.libraries.push(detection("x", raw, DetectionSource::File));
                let weighted = apply_weight(profile, factor, DetectionSource::File, "r");
                let c = weighted.libraries[0].confidence;
                assert!((0.0..=1.0).contains(&c), "{} * {} gave {}", raw, factor, c);
            }
        }
    }

    #[test]
    fn test_merge_keeps_higher_confidence_and_its_source() {
        let mut file = TechnologyProfile::default();
        file.frameworks.push(detection("React", 0.4, DetectionSource::File));
        file.databases.push(detection("redis", 0.8, DetectionSource::File));

        let mut metadata = TechnologyProfile::default();
        metadata.frameworks.push(detection("react", 0.6, DetectionSource::Commit));
        metadata.databases.push(detection("Redis", 0.3, DetectionSource::Metadata));
        metadata.dev_ops.push(detection("GitHub Actions", 0.3, DetectionSource::Metadata));

        let merged = merge_weighted(file, metadata);

        let react = merged.find(TechnologyCategory::Frameworks, "react").unwrap();
        assert_eq!(react.confidence, 0.6);
        assert_eq!(react.source, DetectionSource::Commit);

        let redis = merged.find(TechnologyCategory::Databases, "redis").unwrap();
        assert_eq!(redis.confidence, 0.8);
        assert_eq!(redis.source, DetectionSource::File);

        assert_eq!(merged.frameworks.len(), 1);
        assert_eq!(merged.dev_ops.len(), 1);
    }

    #[test]
    fn test_aggregate_takes_maximum_not_sum() {
        let mut a = TechnologyProfile::default();
        a.languages.push(detection("TypeScript", 0.5, DetectionSource::File));
        a.databases.push(detection("postgres", 0.3, DetectionSource::Metadata));

        let mut b = TechnologyProfile::default();
        b.languages.push(detection("typescript", 0.7, DetectionSource::File));
        b.databases.push(detection("Postgres", 0.35, DetectionSource::Metadata));

        let mut c = TechnologyProfile::default();
        c.languages.push(detection("TypeScript", 0.6, DetectionSource::File));

        let repos = vec![repo("o/a", a), repo("o/b", b), repo("o/c", c)];
        let aggregated = aggregate_profiles(&repos, 0.4);

        assert_eq!(aggregated.languages.len(), 1);
        let ts = &aggregated.languages[0];
        assert!((ts.confidence - 0.7).abs() < 1e-6);
        assert_eq!(ts.repositories, vec!["o/a", "o/b", "o/c"]);

        // 0.3 + 0.35 would clear the threshold if summed
        assert!(aggregated.databases.is_empty());
    }

    #[test]
    fn test_aggregate_threshold_is_inclusive() {
        let mut a = TechnologyProfile::default();
        a.frameworks.push(detection("Flask", 0.4, DetectionSource::File));
        a.frameworks.push(detection("Django", 0.39, DetectionSource::File));
        a.frameworks.push(detection("FastAPI", 0.9, DetectionSource::File));

        let aggregated = aggregate_profiles(&[repo("o/a", a)], 0.4);
        let names: Vec<_> = aggregated.frameworks.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["FastAPI", "Flask"]);
    }
}
