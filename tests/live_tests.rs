use bytes::Bytes;
use question_forge::catalog::Catalog;
use question_forge::config::{STORE_KEY_PLACEHOLDER, STORE_URL_PLACEHOLDER};
use question_forge::clients::flexible::{ClientType, FlexibleClient};
use question_forge::core::ImageInput;
use question_forge::persistence::PersistenceClient;
use question_forge::store::SupabaseStore;
use question_forge::{AppConfig, QuestionExtractor};
use std::sync::Once;

fn init_tracing() {
    static START: Once = Once::new();
    START.call_once(|| {
        // Load .env first so RUST_LOG in .env is seen
        let _ = dotenvy::dotenv();
        let filter = if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::EnvFilter::from_default_env()
        } else {
            tracing_subscriber::EnvFilter::new("question_forge=debug")
        };

        let _ = tracing_subscriber::fmt()
            .with_test_writer() // ensure logs are captured by the test harness
            .without_time()
            .with_env_filter(filter)
            .try_init();
    });
}

/// Set LIVE_QUESTION_IMAGE to a screenshot of a multiple-choice question.
#[tokio::test]
#[ignore]
async fn openai_extracts_question_from_image() -> anyhow::Result<()> {
    init_tracing();
    let Ok(path) = std::env::var("LIVE_QUESTION_IMAGE") else {
        println!("[openai_extracts_question_from_image] LIVE_QUESTION_IMAGE not set, skipping");
        return Ok(());
    };
    let mime = if path.ends_with(".png") { "image/png" } else { "image/jpeg" };
    let bytes = Bytes::from(std::fs::read(&path)?);

    let extractor = QuestionExtractor::new(FlexibleClient::from_type(ClientType::OpenAI));
    let output = extractor.extract_input(ImageInput::new(mime, bytes)).await?;
    println!("[openai_extracts_question_from_image] {:#?}", output);

    assert!(!output.question.is_empty());
    assert!(output.options.len() >= 2);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn supabase_catalog_loads() {
    init_tracing();
    let config = AppConfig::from_env();
    if config.store_url == STORE_URL_PLACEHOLDER || config.store_anon_key == STORE_KEY_PLACEHOLDER {
        println!("[supabase_catalog_loads] store not configured, skipping");
        return;
    }

    let catalog = Catalog::fetch(&PersistenceClient::new(SupabaseStore::from_config(&config))).await;
    println!("[supabase_catalog_loads] {} tests, {} subjects", catalog.test_names.len(), catalog.question_subjects.len());
    assert!(!catalog.is_loading());
}
