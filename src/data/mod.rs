mod generate;
mod run;

pub use generate::*;
pub use run::*;

use crate::core::{Error, Instance, Job, Result};
use ahash::{HashSet, HashSetExt};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// One row of the instance file: a job of an instance.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
struct JobRecord {
    instance: usize,
    processing_time: u64,
    release_date: u64,
}

/// Reads instances from CSV with header `Instance,ProcessingTime,ReleaseDate`.
/// The rows of an instance must be consecutive; job order follows row order.
///
/// # Errors
/// - If a row cannot be parsed.
/// - If the rows of an instance are split by another instance.
/// - If a job has zero processing time.
pub fn read_instances(reader: impl Read) -> Result<Vec<Instance>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut instances: Vec<Instance> = Vec::new();
    let mut seen = HashSet::new();

    for record in reader.deserialize() {
        let record: JobRecord = record?;
        if record.processing_time == 0 {
            return Err(Error::InvalidInstance(format!(
                "instance {} has a job with zero processing time",
                record.instance
            )));
        }

        let job = Job::new(record.processing_time, record.release_date);
        match instances.last_mut() {
            Some(last) if last.id == record.instance => last.jobs.push(job),
            _ => {
                if !seen.insert(record.instance) {
                    return Err(Error::InvalidInstance(format!(
                        "rows of instance {} are not consecutive",
                        record.instance
                    )));
                }
                instances.push(Instance::new(record.instance, vec![job]));
            }
        }
    }

    Ok(instances)
}

/// Writes instances as CSV, one row per job.
///
/// # Errors
/// - If the writer fails.
pub fn write_instances(writer: impl Write, instances: &[Instance]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for instance in instances {
        for job in &instance.jobs {
            writer.serialize(JobRecord {
                instance: instance.id,
                processing_time: job.processing_time,
                release_date: job.release_date,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Loads the instance file at `path`.
///
/// # Errors
/// - If the file cannot be opened or parsed.
pub fn load_instances(path: &Path) -> Result<Vec<Instance>> {
    read_instances(BufReader::new(File::open(path)?))
}

/// Saves instances into the file at `path`, replacing it.
///
/// # Errors
/// - If the file cannot be created or written.
pub fn save_instances(path: &Path, instances: &[Instance]) -> Result<()> {
    write_instances(BufWriter::new(File::create(path)?), instances)
}

#[cfg(test)]
mod test {
    use super::*;

    const FILE: &str = "Instance,ProcessingTime,ReleaseDate\n1,3,5\n1,1,0\n1,4,2\n2,7,1\n";

    #[test]
    fn test_read_instances() -> anyhow::Result<()> {
        let instances = read_instances(FILE.as_bytes())?;

        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].id, 1);
        assert_eq!(instances[0].jobs, vec![Job::new(3, 5), Job::new(1, 0), Job::new(4, 2)]);
        assert_eq!(instances[1], Instance::new(2, vec![Job::new(7, 1)]));
        Ok(())
    }

    #[test]
    fn test_write_instances() -> anyhow::Result<()> {
        let instances = read_instances(FILE.as_bytes())?;
        let mut buffer = Vec::new();
        write_instances(&mut buffer, &instances)?;

        assert_eq!(String::from_utf8(buffer)?, FILE);
        Ok(())
    }

    #[test]
    fn header_only_file_has_no_instances() -> anyhow::Result<()> {
        let instances = read_instances("Instance,ProcessingTime,ReleaseDate\n".as_bytes())?;
        assert!(instances.is_empty());
        Ok(())
    }

    #[test]
    fn test_read_errors() {
        let split = "Instance,ProcessingTime,ReleaseDate\n1,3,5\n2,1,0\n1,4,2\n";
        assert!(matches!(read_instances(split.as_bytes()), Err(Error::InvalidInstance(_))));

        let zero = "Instance,ProcessingTime,ReleaseDate\n1,0,5\n";
        assert!(matches!(read_instances(zero.as_bytes()), Err(Error::InvalidInstance(_))));

        let negative = "Instance,ProcessingTime,ReleaseDate\n1,3,-5\n";
        assert!(matches!(read_instances(negative.as_bytes()), Err(Error::Csv(_))));

        let missing = "Instance,ProcessingTime\n1,3\n";
        assert!(read_instances(missing.as_bytes()).is_err());
    }

    #[test]
    fn test_files() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join("srd_instances_test.csv");
        let instances = read_instances(FILE.as_bytes())?;

        save_instances(&path, &instances)?;
        assert_eq!(load_instances(&path)?, instances);
        std::fs::remove_file(path)?;
        Ok(())
    }
}
