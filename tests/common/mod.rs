use salary_dashboard::{MemoryStore, SalaryRecord};

fn record(name: &str, department: &str, year: i32, salary: f64) -> SalaryRecord {
    SalaryRecord {
        employee_name: name.to_string(),
        job_title: "Professor".to_string(),
        department: department.to_string(),
        calendar_year: year,
        salary,
    }
}

/// Six departments over two years. Chemistry grows fastest (20%), Biology
/// not at all.
pub fn sample_store() -> MemoryStore {
    MemoryStore::new(vec![
        record("Ada", "Physics", 2021, 100_000.0),
        record("Grace", "Physics", 2021, 120_000.0),
        record("Marie", "Chemistry", 2021, 90_000.0),
        record("Rosalind", "Biology", 2021, 60_000.0),
        record("Frida", "Arts", 2021, 40_000.0),
        record("Herodotus", "History", 2021, 30_000.0),
        record("Clara", "Music", 2021, 20_000.0),
        record("Ada", "Physics", 2022, 121_000.0),
        record("Marie", "Chemistry", 2022, 108_000.0),
        record("Rosalind", "Biology", 2022, 60_000.0),
        record("Frida", "Arts", 2022, 44_000.0),
        record("Herodotus", "History", 2022, 30_000.0),
        record("Clara", "Music", 2022, 20_000.0),
    ])
}
