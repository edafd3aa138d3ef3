use tracing::{error, info};

use crate::model::DropdownOption;
use crate::persistence::PersistenceClient;
use crate::store::Store;

/// Remote lookup lists for the required dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub test_names: Vec<DropdownOption>,
    pub question_subjects: Vec<DropdownOption>,
    loading: bool,
}

impl Catalog {
    /// A catalog that has not been fetched yet.
    pub fn loading() -> Self {
        Self { loading: true, ..Self::default() }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Fetch both lists concurrently. If either fails, both come back empty.
    pub async fn fetch<S: Store>(persistence: &PersistenceClient<S>) -> Self {
        let fetched = tokio::try_join!(persistence.get_test_names(), persistence.get_question_subjects());

        match fetched {
            Ok((tests, subjects)) => {
                let catalog = Self {
                    test_names: tests.into_iter().map(DropdownOption::from).collect(),
                    question_subjects: subjects.into_iter().map(DropdownOption::from).collect(),
                    loading: false,
                };
                info!(
                    target: "question_forge::catalog",
                    tests = catalog.test_names.len(),
                    subjects = catalog.question_subjects.len(),
                    "catalog loaded"
                );
                catalog
            }
            Err(e) => {
                error!(target: "question_forge::catalog", error = %e, "Failed to fetch dropdown options");
                Self::default()
            }
        }
    }

    pub fn has_test_name(&self, id: &str) -> bool {
        self.test_names.iter().any(|o| o.value == id)
    }

    pub fn has_subject(&self, id: &str) -> bool {
        self.question_subjects.iter().any(|o| o.value == id)
    }
}
