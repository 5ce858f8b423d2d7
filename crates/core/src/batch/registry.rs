//! Ordered in-memory job registry.

use crate::job::{Job, JobId};

/// Jobs in submission order.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Vec<Job>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn insert(&mut self, job: Job) {
        self.jobs.push(job);
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| &j.id == id)
    }

    pub fn get_mut(&mut self, id: &JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| &j.id == id)
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.get(id).is_some()
    }

    /// Removes exactly the job with `id`.
    pub fn remove(&mut self, id: &JobId) -> Option<Job> {
        let idx = self.jobs.iter().position(|j| &j.id == id)?;
        Some(self.jobs.remove(idx))
    }

    /// Removes every job, returning them in order.
    pub fn drain(&mut self) -> Vec<Job> {
        std::mem::take(&mut self.jobs)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::resolve;

    fn job(id: &str) -> Job {
        Job::new(JobId::from(id), format!("{}.mp3", id), 1, resolve("wav").unwrap())
    }

    #[test]
    fn test_keeps_order_and_removes_exactly_one() {
        let mut registry = JobRegistry::new();
        for id in ["a", "b", "c"] {
            registry.insert(job(id));
        }

        let removed = registry.remove(&JobId::from("b")).unwrap();
        assert_eq!(removed.id, JobId::from("b"));
        let ids: Vec<_> = registry.iter().map(|j| j.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(registry.remove(&JobId::from("b")).is_none());
    }

    #[test]
    fn test_drain() {
        let mut registry = JobRegistry::new();
        registry.insert(job("a"));
        registry.insert(job("b"));
        assert_eq!(registry.drain().len(), 2);
        assert!(registry.is_empty());
    }
}
