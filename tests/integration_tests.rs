
use question_forge::clients::mock::MockResponse;
use question_forge::error::{FormError, SubmitError};
use question_forge::form::SubmitPhase;
use question_forge::options::Difficulty;
use question_forge::persistence::{QUESTIONS_TABLE, SUBJECTS_TABLE, TEST_NAMES_TABLE, UPLOAD_BUCKET};
use question_forge::store::{StoreCall, StoreOp};
use question_forge::InputFile;
use test_utils::{fenced_question, harness, png, Harness};

/// Drop one image, wait for its extraction and select it.
async fn ready(h: &mut Harness, name: &str, question: &str, options: &[&str]) {
    h.ai.add_response(fenced_question(question, options));
    h.app.drop_files(vec![png(name, b"\x89PNG fake")]);
    h.app.wait_for_extractions().await;
    assert!(h.app.select(name));
}

fn fill_catalog_fields(h: &mut Harness) {
    let form = h.app.form_mut();
    form.test_name_id = "t-1".into();
    form.question_subject_id = "s-1".into();
    form.difficulty = Some(Difficulty::Hard);
}

#[tokio::test]
async fn full_flow_uploads_once_and_inserts_once() {
    let mut h = harness();
    h.app.load_catalog().await;
    assert!(h.app.catalog().has_test_name("t-1"));
    assert!(h.app.catalog().has_subject("s-1"));

    ready(&mut h, "q1.png", "<p>What is \\(2+2\\)?</p>", &["<p>3</p>", "<p>4</p>", "<p>5</p>", "<p>6</p>"]).await;
    assert_eq!(h.app.form().options, "<p>3</p>\n<p>4</p>\n<p>5</p>\n<p>6</p>");

    h.app.form_mut().question = "<p>What is \\(2+3\\)?</p>".into();
    h.app.form_mut().select_answer(Some(2));
    fill_catalog_fields(&mut h);

    let mut phases = Vec::new();
    let outcome = h.app.submit_with_progress(|p| phases.push(p)).await.unwrap();

    assert_eq!(phases, vec![SubmitPhase::UploadingImage, SubmitPhase::SavingQuestion]);
    assert_eq!(h.store.count(StoreOp::Upload), 1);
    assert_eq!(h.store.count(StoreOp::Insert), 1);
    assert!(h.alerts.alerts().is_empty());
    assert!(h.app.session().is_saved("q1.png"));

    let correct: Vec<bool> = outcome.question.options.iter().map(|o| o.correct).collect();
    assert_eq!(correct, vec![false, false, true, false]);
    assert_eq!(outcome.question.question, "<p>What is \\(2+3\\)?</p>");

    let rows = h.store.rows(QUESTIONS_TABLE);
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row["image"], outcome.image_url.as_str());
    assert_eq!(row["test_name_id"], "t-1");
    assert_eq!(row["question_subject_id"], "s-1");
    assert_eq!(row["options"][2]["correct"], true);
    assert_eq!(row["options"][2]["type"], "text");
    assert_eq!(row["options"][2]["value"], "<p>5</p>");
}

#[tokio::test]
async fn upload_lands_in_question_images_folder() {
    let mut h = harness();
    ready(&mut h, "scan.jpeg", "Q", &["A", "B"]).await;
    h.app.form_mut().select_answer(Some(0));
    fill_catalog_fields(&mut h);

    let outcome = h.app.submit().await.unwrap();

    let upload = h.store.calls().into_iter().find(|c| matches!(c, StoreCall::Upload { .. })).unwrap();
    let StoreCall::Upload { bucket, path, options, .. } = upload else { unreachable!() };
    assert_eq!(bucket, UPLOAD_BUCKET);
    assert!(path.starts_with("question-images/"));
    assert!(path.ends_with(".jpeg"));
    assert_eq!(options.cache_control, 3600);
    assert!(!options.upsert);
    assert!(outcome.image_url.ends_with(&path));
}

#[tokio::test]
async fn upload_failure_skips_insert_and_alerts() {
    let mut h = harness();
    ready(&mut h, "q1.png", "Q", &["A", "B"]).await;
    h.app.form_mut().select_answer(Some(1));
    fill_catalog_fields(&mut h);
    h.store.fail(StoreOp::Upload, None, "bucket not found");

    let err = h.app.submit().await.unwrap_err();

    assert!(matches!(err, SubmitError::Upload(_)));
    assert_eq!(h.store.count(StoreOp::Insert), 0);
    assert_eq!(h.alerts.alerts(), vec!["Failed to upload image. Please check your file and try again."]);
    assert!(!h.app.session().is_saved("q1.png"));
}

#[tokio::test]
async fn insert_failure_reports_the_orphaned_upload() {
    let mut h = harness();
    ready(&mut h, "q1.png", "Q", &["A", "B"]).await;
    h.app.form_mut().select_answer(Some(1));
    fill_catalog_fields(&mut h);
    h.store.fail(StoreOp::Insert, Some(QUESTIONS_TABLE), "violates foreign key constraint");

    let err = h.app.submit().await.unwrap_err();

    let SubmitError::Save { uploaded_url, .. } = err else { panic!("expected save error") };
    assert_eq!(h.store.object_count(), 1);
    assert!(uploaded_url.contains("question-images/"));
    assert_eq!(h.alerts.alerts(), vec!["Failed to save question. Please check your Supabase configuration."]);
}

#[tokio::test]
async fn invalid_form_never_touches_the_store() {
    let mut h = harness();
    ready(&mut h, "q1.png", "Q", &["only one"]).await;
    fill_catalog_fields(&mut h);
    h.app.form_mut().select_answer(Some(0));

    let err = h.app.submit().await.unwrap_err();
    assert!(matches!(err, SubmitError::Invalid(FormError::TooFewOptions)));

    h.app.form_mut().set_options("A\nB");
    h.app.form_mut().select_answer(None);
    let err = h.app.submit().await.unwrap_err();
    assert!(matches!(err, SubmitError::Invalid(FormError::AnswerRequired)));

    assert_eq!(h.store.count(StoreOp::Upload), 0);
    assert_eq!(h.store.count(StoreOp::Insert), 0);
    assert_eq!(h.alerts.alerts(), vec!["At least 2 options are required", "Please select an answer"]);
}

#[tokio::test]
async fn submit_without_selection_is_rejected() {
    let mut h = harness();
    let err = h.app.submit().await.unwrap_err();
    assert!(matches!(err, SubmitError::Invalid(FormError::NoImageSelected)));
    assert!(h.store.calls().is_empty());
}

#[tokio::test]
async fn regenerate_overwrites_form_but_not_cache() {
    let mut h = harness();
    ready(&mut h, "q1.png", "first", &["A", "B"]).await;

    h.ai.add_response(fenced_question("second", &["C", "D", "E"]));
    h.app.regenerate().await.unwrap();

    assert_eq!(h.app.form().question, "second");
    assert_eq!(h.app.form().answer_choices(), vec!["C", "D", "E"]);
    assert_eq!(h.app.session().extraction("q1.png").map(|o| o.question.as_str()), Some("first"));
}

#[tokio::test]
async fn regenerate_failure_alerts_and_keeps_form() {
    let mut h = harness();
    ready(&mut h, "q1.png", "first", &["A", "B"]).await;

    h.ai.add_response(MockResponse::Error("model overloaded".into()));
    assert!(h.app.regenerate().await.is_err());

    assert_eq!(h.alerts.alerts(), vec!["Failed to generate question from image"]);
    assert_eq!(h.app.form().question, "first");
    assert_eq!(h.app.session().extraction("q1.png").map(|o| o.question.as_str()), Some("first"));
}

#[tokio::test]
async fn selecting_while_pending_changes_nothing() {
    let mut h = harness();
    ready(&mut h, "q1.png", "first", &["A", "B"]).await;

    h.ai.hold();
    h.ai.add_response(fenced_question("second", &["C", "D"]));
    h.app.drop_files(vec![png("q2.png", b"two")]);

    assert!(!h.app.select("q2.png"));
    assert_eq!(h.app.session().selected().map(|s| s.image.name.as_str()), Some("q1.png"));
    assert_eq!(h.app.form().question, "first");

    h.ai.release();
    h.app.wait_for_extractions().await;
    assert!(h.app.select("q2.png"));
    assert_eq!(h.app.form().question, "second");
}

#[tokio::test]
async fn non_images_are_ignored() {
    let mut h = harness();
    h.ai.add_response(fenced_question("Q", &["A", "B"]));

    let names = h.app.drop_files(vec![
        InputFile::new("notes.pdf", "application/pdf", &b"%PDF"[..]),
        png("q1.png", b"img"),
        InputFile::new("readme.txt", "text/plain", &b"hi"[..]),
    ]);
    h.app.wait_for_extractions().await;

    assert_eq!(names, vec!["q1.png"]);
    assert_eq!(h.app.session().images().len(), 1);
    assert_eq!(h.ai.call_count(), 1);
}

async fn assert_catalog_empty_when_failing(table: &str) {
    let mut h = harness();
    assert!(h.app.catalog().is_loading());
    h.store.fail(StoreOp::Select, Some(table), "permission denied");

    let catalog = h.app.load_catalog().await;

    assert!(catalog.test_names.is_empty());
    assert!(catalog.question_subjects.is_empty());
    assert!(!catalog.is_loading());
}

#[tokio::test]
async fn subjects_failure_empties_both_lists() {
    assert_catalog_empty_when_failing(SUBJECTS_TABLE).await;
}

#[tokio::test]
async fn test_names_failure_empties_both_lists() {
    assert_catalog_empty_when_failing(TEST_NAMES_TABLE).await;
}

#[tokio::test]
async fn catalog_lists_are_sorted() {
    let mut h = harness();
    let catalog = h.app.load_catalog().await;

    let tests: Vec<_> = catalog.test_names.iter().map(|o| o.label.as_str()).collect();
    let subjects: Vec<_> = catalog.question_subjects.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(tests, vec!["PUCP 2005", "PUCP 2006"]);
    assert_eq!(subjects, vec!["Algebra", "Physics"]);
    assert_eq!(h.app.difficulties().len(), 4);
}
