use std::sync::Arc;
use taskbench_core::{ConfigError, DocData, Result, RunData, Task, TaskBase};

/// Adds the next document from the content source to the sink.
///
/// The document is fetched in `setup` so only the add is measured. The
/// optional parameter truncates the body to that many bytes.
#[derive(Debug, Clone)]
pub struct AddDocTask {
    base: TaskBase,
    doc_size: usize,
    doc: Option<DocData>,
}

impl AddDocTask {
    pub fn new(run_data: Arc<RunData>) -> Self {
        Self {
            base: TaskBase::new(run_data, "AddDoc"),
            doc_size: 0,
            doc: None,
        }
    }

    pub fn doc_size(&self) -> usize {
        self.doc_size
    }
}

impl Task for AddDocTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn setup(&mut self) -> Result<()> {
        let mut doc = self.base.run_data().next_doc()?;
        doc.truncate_body(self.doc_size);
        self.doc = Some(doc);
        Ok(())
    }

    fn do_logic(&mut self) -> Result<u64> {
        if let Some(doc) = self.doc.take() {
            self.base.run_data().index().add_document(doc);
        }
        Ok(1)
    }

    fn log_message(&self, count: u64) -> String {
        format!("added {count} docs")
    }

    fn clone_task(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }

    fn supports_params(&self) -> bool {
        true
    }

    fn set_params(&mut self, params: &str) -> Result<(), ConfigError> {
        let size = params
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .ok_or_else(|| {
                ConfigError::invalid_params("AddDoc", format!("{params:?} is not a document size"))
            })?;
        self.doc_size = size as usize;
        self.base.set_params(params.trim());
        Ok(())
    }
}
