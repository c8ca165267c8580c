use super::error::{PrepError, Result};
use crate::core::residues::{ResidueRange, parse_residue_range};
use crate::core::theory::LevelOfTheory;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// GB models understood by MMPBSA.py (`igb` in the `&gb` namelist).
pub const SUPPORTED_IGB_MODELS: &[u8] = &[1, 2, 5, 7, 8];

pub const DEFAULT_TRAJECTORY: &str = "md.nc";

const KNOWN_KEYS: &[&str] = &[
    "directory",
    "complex_residues",
    "receptor_residues",
    "ligand_residues",
    "level_of_theory",
    "startframe",
    "endframe",
    "interval",
    "igb",
    "saltcon",
    "qm_residues",
    "qmcharge_com",
    "qmcharge_rec",
    "qmcharge_lig",
    "submit_job",
    "trajectory",
    "topology",
    "job",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSelection {
    pub start: u32,
    pub end: u32,
    pub interval: u32,
}

impl FrameSelection {
    pub fn new(start: u32, end: u32, interval: u32) -> Result<Self> {
        if start == 0 {
            return Err(PrepError::invalid("startframe", "frames are numbered from 1"));
        }
        if interval == 0 {
            return Err(PrepError::invalid("interval", "must be greater than 0"));
        }
        if start >= end {
            return Err(PrepError::invalid(
                "endframe",
                format!("must be greater than startframe ({} >= {})", start, end),
            ));
        }
        Ok(Self {
            start,
            end,
            interval,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QmCharges {
    pub complex: i32,
    pub receptor: i32,
    pub ligand: i32,
}

impl QmCharges {
    /// `receptor + ligand`, widened so that no pair of `i32` charges can overflow.
    pub fn partner_sum(&self) -> i64 {
        i64::from(self.receptor) + i64::from(self.ligand)
    }

    pub fn is_balanced(&self) -> bool {
        i64::from(self.complex) == self.partner_sum()
    }

    /// Fails with `InvalidField("qmcharge_com")` unless `complex == receptor + ligand`.
    pub fn check_balanced(&self) -> Result<()> {
        if self.is_balanced() {
            Ok(())
        } else {
            Err(PrepError::invalid(
                "qmcharge_com",
                format!(
                    "QM charge of the complex ({}) must equal receptor + ligand ({} + {} = {})",
                    self.complex,
                    self.receptor,
                    self.ligand,
                    self.partner_sum()
                ),
            ))
        }
    }
}

/// QM region of a QM/MM-GBSA calculation. Only constructible with balanced charges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QmSettings {
    residues: ResidueRange,
    charges: QmCharges,
}

impl QmSettings {
    pub fn new(residues: ResidueRange, charges: QmCharges) -> Result<Self> {
        charges.check_balanced()?;
        Ok(Self { residues, charges })
    }

    pub fn residues(&self) -> &ResidueRange {
        &self.residues
    }

    pub fn charges(&self) -> QmCharges {
        self.charges
    }
}

/// Static resource values of the batch script. Overridable through the `job` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobSettings {
    pub nodes: u32,
    pub ntasks: u32,
    pub partition: String,
    pub mem: String,
    pub time: String,
    pub account: String,
    pub amber_env: PathBuf,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            nodes: 1,
            ntasks: 8,
            partition: "production".to_string(),
            mem: "8G".to_string(),
            time: "3-00:00:00".to_string(),
            account: "yang_lab_csb".to_string(),
            amber_env: PathBuf::from("/home/shaoq1/bin/amber_env/amber-accre.sh"),
        }
    }
}

/// Input file names inside the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFiles {
    pub trajectory: PathBuf,
    /// `None` selects the single `*.prmtop` found in the source directory.
    pub topology: Option<PathBuf>,
}

impl Default for InputFiles {
    fn default() -> Self {
        Self {
            trajectory: PathBuf::from(DEFAULT_TRAJECTORY),
            topology: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub directory: PathBuf,
    pub complex_residues: ResidueRange,
    pub receptor_residues: ResidueRange,
    pub ligand_residues: ResidueRange,
    pub level_of_theory: LevelOfTheory,
    pub frames: FrameSelection,
    pub igb: u8,
    pub saltcon: f64,
    /// Present iff `level_of_theory` is semiempirical.
    pub qm: Option<QmSettings>,
    pub submit_job: bool,
    pub inputs: InputFiles,
    pub job: JobSettings,
}

impl RunConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let document = ConfigDocument::from_path(path)?;
        Self::from_document(&document)
    }

    /// Validates every field of a loosely typed document into a `RunConfig`.
    pub fn from_document(doc: &ConfigDocument) -> Result<Self> {
        doc.warn_unknown_keys();

        let level_of_theory: LevelOfTheory = doc
            .require_str("level_of_theory")?
            .parse()
            .map_err(|e| PrepError::invalid("level_of_theory", e))?;

        let frames = FrameSelection::new(
            doc.require_u32("startframe")?,
            doc.require_u32("endframe")?,
            doc.require_u32("interval")?,
        )?;

        let mut builder = RunConfigBuilder::new()
            .directory(expand_home(doc.require_str("directory")?))
            .complex_residues(doc.require_residues("complex_residues")?)
            .receptor_residues(doc.require_residues("receptor_residues")?)
            .ligand_residues(doc.require_residues("ligand_residues")?)
            .level_of_theory(level_of_theory)
            .frames(frames)
            .igb(doc.require_int("igb")?)
            .saltcon(doc.require_float("saltcon")?)
            .submit_job(doc.require_bool("submit_job")?)
            .inputs(doc.input_files()?)
            .job(doc.job_settings()?);

        if level_of_theory.is_qm() {
            let charges = QmCharges {
                complex: doc.require_i32("qmcharge_com")?,
                receptor: doc.require_i32("qmcharge_rec")?,
                ligand: doc.require_i32("qmcharge_lig")?,
            };
            builder = builder.qm(QmSettings::new(doc.require_residues("qm_residues")?, charges)?);
        } else if doc.get("qm_residues").is_some() {
            debug!("Ignoring 'qm_residues' because level_of_theory is MM.");
        }

        builder.build()
    }
}

#[derive(Default)]
pub struct RunConfigBuilder {
    directory: Option<PathBuf>,
    complex_residues: Option<ResidueRange>,
    receptor_residues: Option<ResidueRange>,
    ligand_residues: Option<ResidueRange>,
    level_of_theory: Option<LevelOfTheory>,
    frames: Option<FrameSelection>,
    igb: Option<i64>,
    saltcon: Option<f64>,
    qm: Option<QmSettings>,
    submit_job: Option<bool>,
    inputs: Option<InputFiles>,
    job: Option<JobSettings>,
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directory(mut self, path: PathBuf) -> Self {
        self.directory = Some(path);
        self
    }
    pub fn complex_residues(mut self, range: ResidueRange) -> Self {
        self.complex_residues = Some(range);
        self
    }
    pub fn receptor_residues(mut self, range: ResidueRange) -> Self {
        self.receptor_residues = Some(range);
        self
    }
    pub fn ligand_residues(mut self, range: ResidueRange) -> Self {
        self.ligand_residues = Some(range);
        self
    }
    pub fn level_of_theory(mut self, level: LevelOfTheory) -> Self {
        self.level_of_theory = Some(level);
        self
    }
    pub fn frames(mut self, frames: FrameSelection) -> Self {
        self.frames = Some(frames);
        self
    }
    pub fn igb(mut self, igb: i64) -> Self {
        self.igb = Some(igb);
        self
    }
    pub fn saltcon(mut self, saltcon: f64) -> Self {
        self.saltcon = Some(saltcon);
        self
    }
    pub fn qm(mut self, qm: QmSettings) -> Self {
        self.qm = Some(qm);
        self
    }
    pub fn submit_job(mut self, submit: bool) -> Self {
        self.submit_job = Some(submit);
        self
    }
    pub fn inputs(mut self, inputs: InputFiles) -> Self {
        self.inputs = Some(inputs);
        self
    }
    pub fn job(mut self, job: JobSettings) -> Self {
        self.job = Some(job);
        self
    }

    pub fn build(self) -> Result<RunConfig> {
        let missing = |field: &str| PrepError::MissingField(field.to_string());

        let level_of_theory = self
            .level_of_theory
            .ok_or_else(|| missing("level_of_theory"))?;

        let igb = self.igb.ok_or_else(|| missing("igb"))?;
        let igb = u8::try_from(igb)
            .ok()
            .filter(|v| SUPPORTED_IGB_MODELS.contains(v))
            .ok_or_else(|| {
                PrepError::invalid(
                    "igb",
                    format!("{} is not a supported GB model {:?}", igb, SUPPORTED_IGB_MODELS),
                )
            })?;

        let saltcon = self.saltcon.ok_or_else(|| missing("saltcon"))?;
        if !saltcon.is_finite() || saltcon < 0.0 {
            return Err(PrepError::invalid(
                "saltcon",
                format!("{} is not a non-negative concentration", saltcon),
            ));
        }

        match (level_of_theory.is_qm(), &self.qm) {
            (true, None) => return Err(missing("qm_residues")),
            (false, Some(_)) => {
                return Err(PrepError::invalid(
                    "level_of_theory",
                    "QM region given but level of theory is MM",
                ));
            }
            _ => {}
        }

        let directory = self.directory.ok_or_else(|| missing("directory"))?;
        if directory.as_os_str().is_empty() {
            return Err(PrepError::invalid("directory", "path is empty"));
        }

        Ok(RunConfig {
            directory,
            complex_residues: self
                .complex_residues
                .ok_or_else(|| missing("complex_residues"))?,
            receptor_residues: self
                .receptor_residues
                .ok_or_else(|| missing("receptor_residues"))?,
            ligand_residues: self
                .ligand_residues
                .ok_or_else(|| missing("ligand_residues"))?,
            level_of_theory,
            frames: self.frames.ok_or_else(|| missing("startframe"))?,
            igb,
            saltcon,
            qm: self.qm,
            submit_job: self.submit_job.ok_or_else(|| missing("submit_job"))?,
            inputs: self.inputs.unwrap_or_default(),
            job: self.job.unwrap_or_default(),
        })
    }
}

/// A configuration document read into a generic key/value map.
///
/// JSON is the native format; files with a `.toml` extension are parsed as TOML.
#[derive(Debug, Clone, Default)]
pub struct ConfigDocument {
    values: Map<String, Value>,
}

impl ConfigDocument {
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| PrepError::io(path, e))?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let parsed = if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        };
        parsed.map_err(|message| PrepError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_json_str(content: &str) -> std::result::Result<Self, String> {
        match serde_json::from_str::<Value>(content).map_err(|e| e.to_string())? {
            Value::Object(values) => Ok(Self { values }),
            other => Err(format!(
                "top-level value must be an object, found {}",
                kind_of(&other)
            )),
        }
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, String> {
        let values: Map<String, Value> = toml::from_str(content).map_err(|e| e.to_string())?;
        Ok(Self { values })
    }

    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// A present, non-null value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    fn require(&self, key: &str) -> Result<&Value> {
        self.get(key)
            .ok_or_else(|| PrepError::MissingField(key.to_string()))
    }

    fn warn_unknown_keys(&self) {
        for key in self.values.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                warn!("Ignoring unknown configuration key '{}'.", key);
            }
        }
    }

    pub fn require_str(&self, key: &str) -> Result<&str> {
        match self.require(key)? {
            Value::String(s) => Ok(s.as_str()),
            other => Err(PrepError::invalid(
                key,
                format!("expected a string, found {}", kind_of(other)),
            )),
        }
    }

    pub fn require_residues(&self, key: &str) -> Result<ResidueRange> {
        parse_residue_range(self.require_str(key)?).map_err(|e| PrepError::invalid(key, e))
    }

    /// Integers may also be written as numeric strings (`"5000"`).
    pub fn require_int(&self, key: &str) -> Result<i64> {
        let value = self.require(key)?;
        let parsed = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| {
            PrepError::invalid(key, format!("expected an integer, found {}", describe(value)))
        })
    }

    pub fn require_u32(&self, key: &str) -> Result<u32> {
        let value = self.require_int(key)?;
        u32::try_from(value)
            .map_err(|_| PrepError::invalid(key, format!("{} is not a positive integer", value)))
    }

    pub fn require_i32(&self, key: &str) -> Result<i32> {
        let value = self.require_int(key)?;
        i32::try_from(value).map_err(|_| PrepError::invalid(key, format!("{} is out of range", value)))
    }

    pub fn require_float(&self, key: &str) -> Result<f64> {
        let value = self.require(key)?;
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed.filter(|v| v.is_finite()).ok_or_else(|| {
            PrepError::invalid(key, format!("expected a number, found {}", describe(value)))
        })
    }

    /// Accepts a native boolean or the case-insensitive strings `true` / `false`.
    pub fn require_bool(&self, key: &str) -> Result<bool> {
        let value = self.require(key)?;
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(false),
            other => Err(PrepError::invalid(
                key,
                format!("expected true or false, found {}", describe(other)),
            )),
        }
    }

    fn optional_relative_path(&self, key: &str) -> Result<Option<PathBuf>> {
        if self.get(key).is_none() {
            return Ok(None);
        }
        let raw = self.require_str(key)?.trim();
        let path = PathBuf::from(raw);
        if raw.is_empty() || path.is_absolute() {
            return Err(PrepError::invalid(
                key,
                "must be a file name relative to 'directory'",
            ));
        }
        Ok(Some(path))
    }

    fn input_files(&self) -> Result<InputFiles> {
        Ok(InputFiles {
            trajectory: self
                .optional_relative_path("trajectory")?
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TRAJECTORY)),
            topology: self.optional_relative_path("topology")?,
        })
    }

    fn job_settings(&self) -> Result<JobSettings> {
        match self.get("job") {
            None => Ok(JobSettings::default()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| PrepError::invalid("job", e)),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        Value::Number(n) => n.to_string(),
        other => kind_of(other).to_string(),
    }
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    let raw = raw.trim();
    let rest = if raw == "~" {
        Some("")
    } else {
        raw.strip_prefix("~/")
    };
    match (rest, directories::BaseDirs::new()) {
        (Some(rest), Some(dirs)) => dirs.home_dir().join(rest),
        _ => PathBuf::from(raw),
    }
}
