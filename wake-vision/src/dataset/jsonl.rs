use super::{AnnotatedRecord, RecordSource, RecordStream, Split};
use crate::{common::*, error::CurationError};
use async_std::{
    fs::File,
    io::{prelude::BufReadExt as _, BufReader},
};

/// A record source reading one `<split>.jsonl` file per split.
///
/// Each non-blank line holds one JSON encoded [AnnotatedRecord].
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    dir: PathBuf,
}

impl JsonLinesSource {
    pub fn new<P>(dir: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let dir = dir.as_ref();
        ensure!(dir.is_dir(), "'{}' is not a directory", dir.display());
        Ok(Self {
            dir: dir.to_owned(),
        })
    }

    pub fn split_path(&self, split: Split) -> PathBuf {
        self.dir.join(format!("{}.jsonl", split))
    }
}

impl RecordSource for JsonLinesSource {
    fn stream(&self, split: Split) -> Result<RecordStream> {
        let path = self.split_path(split);
        ensure!(path.is_file(), "'{}' is not a file", path.display());
        debug!("read records from '{}'", path.display());

        let stream = stream::once(async move {
            let file = File::open(&path)
                .await
                .with_context(|| format!("failed to open '{}'", path.display()))?;
            let lines = BufReader::new(file).lines().map_err(Error::from);
            Fallible::Ok(lines)
        })
        .try_flatten()
        .enumerate()
        .filter_map(|(index, line)| {
            let item = match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some(parse_line(index + 1, &line)),
                Err(err) => Some(Err(err)),
            };
            future::ready(item)
        })
        .boxed();

        Ok(stream)
    }
}

fn parse_line(line_no: usize, line: &str) -> Result<AnnotatedRecord> {
    serde_json::from_str(line).map_err(|err| {
        CurationError::schema("record", format!("line {}: {}", line_no, err)).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_split(dir: &Path, split: Split, lines: &[&str]) {
        let mut file = std::fs::File::create(dir.join(format!("{}.jsonl", split))).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "wake-vision-jsonl-{}-{}",
            name,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const RECORD: &str = r#"{"id":"a","image":{"v":1,"dim":[1,1,3],"data":[1,2,3]},"objects":{"label":[14048],"confidence":[1.0]}}"#;

    #[tokio::test]
    async fn read_jsonl_records() -> Result<()> {
        let dir = temp_dir("read");
        write_split(&dir, Split::Validation, &[RECORD, "", "  ", RECORD]);

        let source = JsonLinesSource::new(&dir)?;
        let records: Vec<_> = source.stream(Split::Validation)?.try_collect().await?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id.as_deref(), Some("a"));
        assert_eq!(records[0].image.dim(), (1, 1, 3));

        assert!(source.stream(Split::Test).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn report_line_of_malformed_record() -> Result<()> {
        let dir = temp_dir("malformed");
        write_split(&dir, Split::Train, &[RECORD, "{\"image\": 3}"]);

        let source = JsonLinesSource::new(&dir)?;
        let results: Vec<_> = source.stream(Split::Train)?.collect().await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());

        let err = results[1].as_ref().unwrap_err();
        match err.downcast_ref::<CurationError>() {
            Some(CurationError::Schema { field, reason }) => {
                assert_eq!(field, "record");
                assert!(reason.starts_with("line 2:"));
            }
            _ => panic!("unexpected error {:?}", err),
        }
        Ok(())
    }
}
