//! YAML description of a batch: course curriculum, faculty, module timings
//! and holidays. Imported into the database by `db::import_batch`.
use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFixture {
    pub batch: BatchSpec,
    pub faculty: Vec<String>,
    pub modules: Vec<ModuleSpec>,
    #[serde(default)]
    pub holidays: Vec<HolidaySpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSpec {
    pub name: String,
    pub code: String,
    pub course_name: String,
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub total_intake: i64,
    #[serde(default)]
    pub total_students: i64,
    pub sales_person: Option<String>,
    pub eligibility: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    pub order: i64,
    pub faculty: Option<String>,
    #[serde(default)]
    pub timings: Vec<TimingSpec>,
    #[serde(default)]
    pub topics: Vec<TopicSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingSpec {
    /// `Mon`, `Tuesday`, ...
    pub day: String,
    /// `HH:MM` or `HH:MM:SS`
    pub from: String,
    pub to: String,
    /// Defaults to the module's faculty.
    pub faculty: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSpec {
    pub name: String,
    pub minutes: i64,
    #[serde(default)]
    pub sub_topics: Vec<SubTopicSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTopicSpec {
    pub name: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidaySpec {
    pub date: NaiveDate,
    pub description: Option<String>,
}

impl TimingSpec {
    pub fn weekday(&self) -> Result<Weekday> {
        self.day
            .trim()
            .parse::<Weekday>()
            .map_err(|_| anyhow!("invalid weekday '{}'", self.day))
    }

    pub fn window(&self) -> Result<(NaiveTime, NaiveTime)> {
        Ok((parse_time(&self.from)?, parse_time(&self.to)?))
    }
}

pub fn parse_time(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| anyhow!("invalid time '{}', expected HH:MM", s))
}

pub fn parse(yaml: &str) -> Result<BatchFixture> {
    let fixture: BatchFixture = serde_yaml::from_str(yaml).context("invalid batch fixture")?;
    fixture.validate()?;
    Ok(fixture)
}

pub fn load(path: &Path) -> Result<BatchFixture> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse(&content)
}

impl BatchFixture {
    /// Checks the importer relies on: known faculty, distinct positive module
    /// order, parseable timings and non-negative durations.
    pub fn validate(&self) -> Result<()> {
        if self.batch.code.trim().is_empty() {
            bail!("batch.code must be non-empty");
        }
        let faculty: HashSet<&str> = self.faculty.iter().map(String::as_str).collect();
        let mut orders = HashSet::new();
        for module in &self.modules {
            if module.order <= 0 {
                bail!("module '{}' has non-positive order {}", module.name, module.order);
            }
            if !orders.insert(module.order) {
                bail!("duplicate module order {}", module.order);
            }
            if let Some(name) = module.faculty.as_deref() {
                if !faculty.contains(name) {
                    bail!("module '{}' references unknown faculty '{}'", module.name, name);
                }
            }
            for timing in &module.timings {
                timing.weekday()?;
                timing.window()?;
                match timing.faculty.as_deref().or(module.faculty.as_deref()) {
                    Some(name) if faculty.contains(name) => {}
                    Some(name) => bail!("timing references unknown faculty '{}'", name),
                    None => bail!("timing of module '{}' has no faculty", module.name),
                }
            }
            for topic in &module.topics {
                if topic.minutes < 0 || topic.sub_topics.iter().any(|s| s.minutes < 0) {
                    bail!("topic '{}' has a negative duration", topic.name);
                }
                let sub_total: i64 = topic.sub_topics.iter().map(|s| s.minutes).sum();
                if sub_total > topic.minutes {
                    bail!(
                        "sub-topics of '{}' add up to {} minutes, more than its {}",
                        topic.name,
                        sub_total,
                        topic.minutes
                    );
                }
            }
        }
        Ok(())
    }
}

/// Sample fixture, also used by the tests.
pub fn example() -> &'static str {
    r#"batch:
  name: "Golang January"
  code: "GO-2024-01"
  course_name: "Golang"
  start_date: "2024-01-01"
  total_intake: 30

faculty:
  - "Asha Rao"
  - "Vikram Shah"

modules:
  - name: "Basics"
    order: 1
    faculty: "Asha Rao"
    timings:
      - { day: "Mon", from: "10:00", to: "12:00" }
      - { day: "Wed", from: "10:00", to: "12:00" }
    topics:
      - { name: "Syntax", minutes: 90 }
      - { name: "Types", minutes: 60 }
      - name: "Control flow"
        minutes: 90
        sub_topics:
          - { name: "Loops", minutes: 45 }
          - { name: "Switch", minutes: 45 }
  - name: "Concurrency"
    order: 2
    faculty: "Vikram Shah"
    timings:
      - { day: "Tue", from: "14:00", to: "16:00" }
    topics:
      - { name: "Goroutines", minutes: 120 }

holidays:
  - { date: "2024-01-15", description: "Pongal" }
"#
}
