//! Caller-independent representation of one variant file record, before standardization
//!
//! This is the shape exchanged with the variant file reader and writer: a record is a chromosome,
//! 1-indexed position, alleles, and typed INFO/FORMAT fields.
//!

use std::collections::BTreeMap;

use crate::errors::StandardizeError;

/// A typed INFO or FORMAT field value
///
/// Missing values are dropped when a record is read, so a field that is entirely missing is simply
/// absent from its map.
///
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Flag,
    Integer(Vec<i32>),
    Float(Vec<f32>),
    String(Vec<String>),
}

impl FieldValue {
    pub fn from_str_value(x: &str) -> Self {
        FieldValue::String(vec![x.to_string()])
    }

    fn first_string(&self) -> Option<String> {
        match self {
            FieldValue::Flag => None,
            FieldValue::Integer(x) => x.first().map(|v| v.to_string()),
            FieldValue::Float(x) => x.first().map(|v| v.to_string()),
            FieldValue::String(x) => x.first().cloned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawSample {
    pub name: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl RawSample {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: BTreeMap::new(),
        }
    }

    /// Genotype string such as "0/1", or None if the sample has no GT field
    pub fn genotype(&self) -> Option<&str> {
        match self.fields.get("GT") {
            Some(FieldValue::String(x)) => x.first().map(|s| s.as_str()),
            _ => None,
        }
    }

    /// First integer value of a FORMAT field
    pub fn get_integer(&self, key: &str) -> Option<i32> {
        match self.fields.get(key) {
            Some(FieldValue::Integer(x)) => x.first().copied(),
            Some(FieldValue::Float(x)) => x.first().map(|v| v.round() as i32),
            Some(FieldValue::String(x)) => x.first().and_then(|s| s.parse::<i32>().ok()),
            _ => None,
        }
    }

    /// All integer values of a FORMAT field
    pub fn get_integers(&self, key: &str) -> Option<&[i32]> {
        match self.fields.get(key) {
            Some(FieldValue::Integer(x)) => Some(x.as_slice()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawRecord {
    pub chrom: String,

    /// 1-indexed position
    pub pos: i64,

    /// Record ID, or '.' if none was given
    pub id: String,
    pub ref_allele: String,
    pub alts: Vec<String>,
    pub info: BTreeMap<String, FieldValue>,
    pub samples: Vec<RawSample>,

    /// Caller tag from the variant file header, if any
    pub source: Option<String>,
}

impl RawRecord {
    pub fn new(chrom: &str, pos: i64, id: &str, ref_allele: &str, alt: &str) -> Self {
        Self {
            chrom: chrom.to_string(),
            pos,
            id: id.to_string(),
            ref_allele: ref_allele.to_string(),
            alts: vec![alt.to_string()],
            info: BTreeMap::new(),
            samples: Vec::new(),
            source: None,
        }
    }

    pub fn first_alt(&self) -> Option<&str> {
        self.alts.first().map(|x| x.as_str())
    }

    pub fn has_info(&self, key: &str) -> bool {
        self.info.contains_key(key)
    }

    pub fn info_flag(&self, key: &str) -> bool {
        self.info.contains_key(key)
    }

    /// First value of an INFO field as a string, regardless of the field type
    pub fn info_string(&self, key: &str) -> Option<String> {
        self.info.get(key).and_then(|x| x.first_string())
    }

    /// All values of a string INFO field
    pub fn info_strings(&self, key: &str) -> Vec<String> {
        match self.info.get(key) {
            Some(FieldValue::String(x)) => x.clone(),
            Some(FieldValue::Integer(x)) => x.iter().map(|v| v.to_string()).collect(),
            Some(FieldValue::Float(x)) => x.iter().map(|v| v.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    fn invalid_field(&self, key: &str, value: &str) -> StandardizeError {
        StandardizeError::InvalidField {
            id: self.id.clone(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    /// First value of an INFO field as an integer
    ///
    /// Returns None if the field is absent, and an error if the field is present but can't be
    /// interpreted as an integer.
    ///
    pub fn info_i64(&self, key: &str) -> Result<Option<i64>, StandardizeError> {
        match self.info.get(key) {
            None => Ok(None),
            Some(FieldValue::Integer(x)) => Ok(x.first().map(|&v| v as i64)),
            Some(FieldValue::Float(x)) => Ok(x.first().map(|&v| v as i64)),
            Some(FieldValue::String(x)) => match x.first() {
                None => Ok(None),
                Some(s) => s
                    .parse::<i64>()
                    .map(Some)
                    .map_err(|_| self.invalid_field(key, s)),
            },
            Some(FieldValue::Flag) => Err(self.invalid_field(key, "<flag>")),
        }
    }

    /// All values of an INFO field as integers, with the same error handling as [Self::info_i64]
    pub fn info_i64_list(&self, key: &str) -> Result<Option<Vec<i64>>, StandardizeError> {
        match self.info.get(key) {
            None => Ok(None),
            Some(FieldValue::Integer(x)) => Ok(Some(x.iter().map(|&v| v as i64).collect())),
            Some(FieldValue::Float(x)) => Ok(Some(x.iter().map(|&v| v as i64).collect())),
            Some(FieldValue::String(x)) => {
                let mut vals = Vec::new();
                for s in x {
                    vals.push(s.parse::<i64>().map_err(|_| self.invalid_field(key, s))?);
                }
                Ok(Some(vals))
            }
            Some(FieldValue::Flag) => Err(self.invalid_field(key, "<flag>")),
        }
    }

    /// Builder-style INFO setter, mostly for constructing test records
    pub fn with_info(mut self, key: &str, value: FieldValue) -> Self {
        self.info.insert(key.to_string(), value);
        self
    }

    /// Builder-style sample setter, mostly for constructing test records
    pub fn with_sample(mut self, name: &str, fields: &[(&str, FieldValue)]) -> Self {
        let mut sample = RawSample::new(name);
        for (key, value) in fields {
            sample.fields.insert(key.to_string(), value.clone());
        }
        self.samples.push(sample);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_i64() {
        let rec = RawRecord::new("chr1", 100, "a", "N", "<DEL>")
            .with_info("END", FieldValue::Integer(vec![500]))
            .with_info("SVLEN", FieldValue::from_str_value("-400"))
            .with_info("CHR2", FieldValue::from_str_value("chrX"));

        assert_eq!(rec.info_i64("END"), Ok(Some(500)));
        assert_eq!(rec.info_i64("SVLEN"), Ok(Some(-400)));
        assert_eq!(rec.info_i64("MISSING"), Ok(None));
        assert!(matches!(
            rec.info_i64("CHR2"),
            Err(StandardizeError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_sample_fields() {
        let rec = RawRecord::new("chr1", 100, "a", "N", "<DEL>").with_sample(
            "s1",
            &[
                ("GT", FieldValue::from_str_value("0/1")),
                ("GQ", FieldValue::Integer(vec![45])),
                ("PR", FieldValue::Integer(vec![10, 4])),
            ],
        );
        let sample = &rec.samples[0];
        assert_eq!(sample.genotype(), Some("0/1"));
        assert_eq!(sample.get_integer("GQ"), Some(45));
        assert_eq!(sample.get_integers("PR"), Some([10, 4].as_slice()));
        assert_eq!(sample.get_integer("SU"), None);
    }
}
