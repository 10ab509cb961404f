use std::sync::Arc;
use anyhow::bail;
use tracing_subscriber::EnvFilter;
use tg_core::{GenerationSettings, JobState};
use thumbgen_app::generator::backend::GeminiBackend;
use thumbgen_app::generator::db::JobDatabase;
use thumbgen_app::{AppConfig, JobManager, ManagerOptions, SessionContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thumbgen=info,thumbgen_app=info".into()),
        )
        .init();

    let config = AppConfig::load()?;

    let db_path = std::env::current_dir()?.join(&config.db_path);
    let store = JobDatabase::open(db_path).await?;
    let backend = GeminiBackend::new(config.api_base.clone());
    let session = Arc::new(SessionContext::new(config.api_key.clone()));

    let manager = JobManager::new(
        Arc::new(store),
        Arc::new(backend),
        session,
        ManagerOptions::from(&config),
    );

    let repaired = manager.load_history().await;
    if repaired > 0 {
        println!("Marked {repaired} interrupted job(s) as failed");
    }

    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let result = if prompt.trim().is_empty() {
        print_gallery(&manager);
        Ok(())
    } else {
        generate(&manager, &config, prompt).await
    };

    manager.shutdown().await;
    result
}

async fn generate(manager: &JobManager, config: &AppConfig, prompt: String) -> anyhow::Result<()> {
    if manager.session().needs_reauth() {
        bail!("No API key found. Please add GEMINI_API_KEY to your environment or .env file");
    }

    let settings = GenerationSettings {
        main_prompt: prompt,
        generation_count: config.replicate_count,
        ..Default::default()
    };
    let ids = manager.submit(&settings, settings.generation_count).await?;
    let model = settings.model().map_or(settings.model_id.as_str(), |m| m.name());
    println!("Generating {} image(s) with {model}...", ids.len());

    manager.wait_idle().await;

    for id in ids {
        let Some(job) = manager.job(id) else {
            continue;
        };
        match job.state() {
            JobState::Success { .. } => {
                let path = manager.export(id, &config.export_dir).await?;
                println!("✅ {id} saved to {}", path.display());
            }
            JobState::Error { message } => println!("❌ {id} failed: {message}"),
            state => println!("{} {id} {:?}", job.status().icon(), state),
        }
    }

    if manager.session().needs_reauth() {
        bail!("The API key was rejected; set a new GEMINI_API_KEY");
    }

    Ok(())
}

fn print_gallery(manager: &JobManager) {
    let jobs = manager.jobs();
    if jobs.is_empty() {
        println!("Gallery is empty. Pass a prompt to generate a thumbnail.");
        return;
    }

    for job in jobs {
        let created = job.created_at().format("%Y-%m-%d %H:%M:%S");
        let detail = job.error().unwrap_or(&job.settings().main_prompt);
        println!("{} {created} {} {detail}", job.status().icon(), job.id());
    }
}
