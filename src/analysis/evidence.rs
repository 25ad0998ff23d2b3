use crate::models::RepositoryTree;

/// Manifest, build and configuration names, checked against the lowercased
/// file name.
const KEY_FILE_KEYWORDS: &[&str] = &[
    "package.json",
    "requirements",
    "pyproject.toml",
    "setup.py",
    "pipfile",
    "go.mod",
    "cargo.toml",
    "pom.xml",
    "build.gradle",
    "gemfile",
    "composer.json",
    "dockerfile",
    "docker-compose",
    "makefile",
    "serverless",
    "terraform",
    "config",
    "settings",
];

const KEY_FILES_IN_SUMMARY: usize = 30;

/// How useful a changed file is as technology evidence; lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EvidenceRank {
    Manifest,
    Config,
    Source,
    Other,
}

pub fn evidence_rank(path: &str) -> Option<EvidenceRank> {
    let lower = path.to_lowercase();
    if is_excluded(&lower) {
        return None;
    }

    let file_name = lower.rsplit('/').next().unwrap_or(&lower);
    if KEY_FILE_KEYWORDS.iter().any(|k| file_name.contains(k)) {
        return Some(EvidenceRank::Manifest);
    }

    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    let rank = match extension {
        "json" | "toml" | "yaml" | "yml" | "xml" | "gradle" | "ini" | "cfg" | "conf" | "tf"
        | "properties" => EvidenceRank::Config,
        "rs" | "py" | "ts" | "tsx" | "js" | "jsx" | "mjs" | "go" | "java" | "kt" | "scala"
        | "rb" | "php" | "cs" | "swift" | "c" | "cc" | "cpp" | "h" | "hpp" | "ex" | "exs"
        | "dart" | "vue" | "svelte" | "sql" | "graphql" | "sh" => EvidenceRank::Source,
        _ => EvidenceRank::Other,
    };
    Some(rank)
}

/// Lock files, vendored trees, minified bundles and binary assets say
/// nothing a model can read.
fn is_excluded(lower_path: &str) -> bool {
    const EXCLUDED_DIRS: &[&str] = &["node_modules/", "vendor/", "dist/", "build/", ".git/", "target/"];
    const EXCLUDED_EXTENSIONS: &[&str] = &[
        "lock", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "pdf", "zip", "gz", "tar",
        "jar", "woff", "woff2", "ttf", "eot", "mp4", "mp3", "exe", "dll", "so", "bin", "map",
    ];

    if EXCLUDED_DIRS
        .iter()
        .any(|dir| lower_path.starts_with(dir) || lower_path.contains(&format!("/{}", dir)))
    {
        return true;
    }
    if lower_path.ends_with(".min.js") || lower_path.ends_with("package-lock.json") {
        return true;
    }
    lower_path
        .rsplit_once('.')
        .map(|(_, ext)| EXCLUDED_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Changed paths ordered by [`evidence_rank`], excluded paths removed.
/// The sort is stable, so equally ranked files keep commit order.
pub fn rank_changed_files(paths: &[String]) -> Vec<String> {
    let mut ranked: Vec<(EvidenceRank, &String)> = paths
        .iter()
        .filter_map(|p| evidence_rank(p).map(|rank| (rank, p)))
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, p)| p.clone()).collect()
}

/// Manifest and configuration paths from a repository tree, for the
/// metadata-only summary.
pub fn key_files_from_tree(tree: &RepositoryTree) -> Vec<String> {
    tree.tree
        .iter()
        .filter(|entry| entry.is_file())
        .filter(|entry| evidence_rank(&entry.path) == Some(EvidenceRank::Manifest))
        .map(|entry| entry.path.clone())
        .take(KEY_FILES_IN_SUMMARY)
        .collect()
}
