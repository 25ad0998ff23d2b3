use clap::Parser;
use tracing_subscriber::EnvFilter;

use techprofile::models::{GitHubProfileAnalysis, TechnologyCategory};
use techprofile::{Config, GeminiProvider, GitHubClient, ProfileAnalyzer, TechnologyExtractor};

#[derive(Parser, Debug)]
#[command(name = "techprofile")]
#[command(version = "0.1.0")]
#[command(about = "Detect the technologies a GitHub user demonstrably works with")]
struct Args {
    /// GitHub username to analyze
    #[arg(short, long)]
    username: String,

    /// Real name, used to attribute commits made under a different author name
    #[arg(short, long)]
    real_name: Option<String>,

    /// Output format (json, text, markdown)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Do not inspect upstream commits of forks without own commits
    #[arg(long)]
    no_fork_fallback: bool,

    /// Maximum repositories to analyze in depth
    #[arg(long)]
    max_repositories: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("techprofile=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = Config::from_env()?;

    let mut pipeline_config = config.pipeline.clone();
    if args.no_fork_fallback {
        pipeline_config.fork_fallback = false;
    }
    if let Some(max) = args.max_repositories {
        pipeline_config.max_analyzed_repositories = max;
    }

    let github = GitHubClient::connect(&config.github_app).await?;
    match github.get_rate_limit().await {
        Ok(limit) => tracing::info!(
            "GitHub rate limit: {}/{} remaining, resets at {}",
            limit.remaining,
            limit.limit,
            limit.reset
        ),
        Err(e) => tracing::warn!("Could not read GitHub rate limit: {}", e),
    }

    let llm = GeminiProvider::new(config.gemini_api_key.clone())?;
    let extractor = TechnologyExtractor::new(llm, config.models.clone())?;
    tracing::info!("Using model {} first", extractor.current_model());

    let analyzer = ProfileAnalyzer::new(github, extractor, pipeline_config);
    let analysis = analyzer
        .analyze_profile(&args.username, args.real_name.as_deref())
        .await?;

    output_analysis(&analysis, &args)?;

    Ok(())
}

fn output_analysis(analysis: &GitHubProfileAnalysis, args: &Args) -> anyhow::Result<()> {
    let output = match args.format.as_str() {
        "json" => serde_json::to_string_pretty(analysis)?,
        "markdown" => format_markdown(analysis),
        _ => format_text(analysis),
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &output)?;
        tracing::info!("Output written to: {}", path);
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn format_text(analysis: &GitHubProfileAnalysis) -> String {
    let mut output = String::new();

    output.push_str(&format!("\n=== Technology Profile: {} ===\n\n", analysis.username));
    if let Some(ref name) = analysis.real_name {
        output.push_str(&format!("Name: {}\n", name));
    }
    output.push_str(&format!("Public repositories: {}\n", analysis.repository_count));
    output.push_str(&format!("Analyzed repositories: {}\n", analysis.repositories.len()));

    for category in TechnologyCategory::ALL {
        let detections = analysis.technologies.category(category);
        if detections.is_empty() {
            continue;
        }
        output.push_str(&format!("\n{}:\n", category));
        for detection in detections {
            output.push_str(&format!(
                "  - {} ({:.0}%, {})\n",
                detection.name,
                detection.confidence * 100.0,
                detection.repositories.join(", ")
            ));
        }
    }

    if !analysis.repositories.is_empty() {
        output.push_str("\nRepositories:\n");
        for repo in &analysis.repositories {
            output.push_str(&format!(
                "  - {}: {} commits, {} files, {} technologies\n",
                repo.full_name,
                repo.attributed_commits,
                repo.files_analyzed,
                repo.technologies.len()
            ));
        }
    }

    let summary = &analysis.contribution_summary;
    output.push_str("\nRecent Activity:\n");
    if let Some(ref error) = summary.error {
        output.push_str(&format!("  unavailable ({})\n", error));
    } else {
        output.push_str(&format!("  Events: {}\n", summary.total_activities));
        output.push_str(&format!("  Own repositories: {}\n", summary.own_repository_activities));
        output.push_str(&format!("  Other repositories: {}\n", summary.open_source_contributions));
        output.push_str(&format!(
            "  Pushes: {} ({} commits), pull requests: {}, reviews: {}\n",
            summary.pushes, summary.pushed_commits, summary.pull_requests, summary.reviews
        ));
    }

    output.push_str(&format!(
        "\nAnalyzed on: {}\n",
        analysis.analyzed_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}

fn format_markdown(analysis: &GitHubProfileAnalysis) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Technology Profile: {}\n\n", analysis.username));
    if let Some(ref name) = analysis.real_name {
        output.push_str(&format!("**Name:** {}\n\n", name));
    }

    output.push_str("## Technologies\n\n");
    output.push_str("| Technology | Category | Confidence | Repositories |\n");
    output.push_str("|------------|----------|------------|--------------|\n");
    for (category, detection) in analysis.technologies.iter() {
        output.push_str(&format!(
            "| {} | {} | {:.0}% | {} |\n",
            detection.name,
            category,
            detection.confidence * 100.0,
            detection.repositories.join(", ")
        ));
    }

    if !analysis.repositories.is_empty() {
        output.push_str("\n## Repositories\n\n");
        output.push_str("| Repository | Commits | Files | Technologies |\n");
        output.push_str("|------------|---------|-------|--------------|\n");
        for repo in &analysis.repositories {
            output.push_str(&format!(
                "| [{}]({}) | {} | {} | {} |\n",
                repo.full_name,
                repo.url,
                repo.attributed_commits,
                repo.files_analyzed,
                repo.technologies.len()
            ));
        }
    }

    let summary = &analysis.contribution_summary;
    output.push_str("\n## Recent Activity\n\n");
    match summary.error {
        Some(ref error) => output.push_str(&format!("_Unavailable: {}_\n", error)),
        None => {
            output.push_str("| Activity | Count |\n|----------|-------|\n");
            for (activity, count) in &summary.by_type {
                output.push_str(&format!("| {} | {} |\n", activity, count));
            }
            output.push_str(&format!(
                "\n{} of {} events in repositories the user does not own.\n",
                summary.open_source_contributions, summary.total_activities
            ));
        }
    }

    output.push_str(&format!(
        "\n---\n*Analyzed on {}*\n",
        analysis.analyzed_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}
