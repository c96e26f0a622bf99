use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::info;

use crate::AppPaths;

use super::database::{
    ChaserDef, DefDatabase, DialogueLineDef, DialogueZoneDef, SequenceDef, StalkerDef,
    StepActionKind, StepDef, DEFAULT_DIALOGUE_ZONE_RADIUS, DEFAULT_EXTRA_READING_TIME,
};
use super::hashing::hash_sources;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDef,
    DuplicateStepId,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

#[derive(Debug, Default)]
struct ParsedDefs {
    sequences: Vec<SequenceDef>,
    chasers: Vec<ChaserDef>,
    stalkers: Vec<StalkerDef>,
    dialogue_zones: Vec<DialogueZoneDef>,
}

impl ParsedDefs {
    fn append(&mut self, other: ParsedDefs) {
        self.sequences.extend(other.sequences);
        self.chasers.extend(other.chasers);
        self.stalkers.extend(other.stalkers);
        self.dialogue_zones.extend(other.dialogue_zones);
    }
}

/// Compiles every `*.xml` under the content directory into one database.
/// Files are read in normalized relative-path order; a `defName` may appear
/// only once per def type across all files.
pub fn compile_def_database(app_paths: &AppPaths) -> Result<DefDatabase, ContentCompileError> {
    let content_dir = &app_paths.content_dir;
    if !content_dir.is_dir() {
        info!(content_dir = %content_dir.display(), "content_dir_missing_using_empty_database");
        return Ok(DefDatabase::default());
    }

    let xml_files = collect_xml_files_sorted(content_dir)
        .map_err(|error| read_error(error.path, error.source))?;

    let mut sources = Vec::<(String, Vec<u8>)>::with_capacity(xml_files.len());
    let mut parsed = ParsedDefs::default();
    let mut seen = SeenDefNames::default();
    for (rel_path, abs_path) in xml_files {
        let raw = fs::read_to_string(&abs_path)
            .map_err(|source| read_error(abs_path.clone(), source))?;
        let defs = parse_defs_document(&abs_path, &raw)?;
        seen.check(&defs, &abs_path)?;
        parsed.append(defs);
        sources.push((rel_path, raw.into_bytes()));
    }

    let fingerprint = hash_sources(
        sources
            .iter()
            .map(|(rel_path, bytes)| (rel_path.as_str(), bytes.as_slice())),
    );
    let database = into_database(parsed, fingerprint);
    info!(
        def_count = database.def_count(),
        sequence_count = database.sequences().len(),
        fingerprint = database.fingerprint(),
        "content_compiled"
    );
    Ok(database)
}

/// Compiles a single in-memory document; `label` stands in for the file path
/// in errors and in the fingerprint.
pub fn compile_defs_str(label: &str, raw: &str) -> Result<DefDatabase, ContentCompileError> {
    let file_path = PathBuf::from(label);
    let defs = parse_defs_document(&file_path, raw)?;
    SeenDefNames::default().check(&defs, &file_path)?;
    let fingerprint = hash_sources([(label, raw.as_bytes())]);
    Ok(into_database(defs, fingerprint))
}

fn into_database(parsed: ParsedDefs, fingerprint: String) -> DefDatabase {
    DefDatabase::from_defs(
        parsed.sequences,
        parsed.chasers,
        parsed.stalkers,
        parsed.dialogue_zones,
        fingerprint,
    )
}

#[derive(Default)]
struct SeenDefNames {
    sequences: HashSet<String>,
    chasers: HashSet<String>,
    stalkers: HashSet<String>,
    dialogue_zones: HashSet<String>,
}

impl SeenDefNames {
    fn check(&mut self, defs: &ParsedDefs, file_path: &Path) -> Result<(), ContentCompileError> {
        let groups: [(&str, &mut HashSet<String>, Vec<&str>); 4] = [
            (
                "SequenceDef",
                &mut self.sequences,
                defs.sequences.iter().map(|d| d.def_name.as_str()).collect(),
            ),
            (
                "ChaserDef",
                &mut self.chasers,
                defs.chasers.iter().map(|d| d.def_name.as_str()).collect(),
            ),
            (
                "StalkerDef",
                &mut self.stalkers,
                defs.stalkers.iter().map(|d| d.def_name.as_str()).collect(),
            ),
            (
                "DialogueZoneDef",
                &mut self.dialogue_zones,
                defs.dialogue_zones
                    .iter()
                    .map(|d| d.def_name.as_str())
                    .collect(),
            ),
        ];

        for (def_type, seen, names) in groups {
            for name in names {
                if !seen.insert(name.to_string()) {
                    return Err(ContentCompileError {
                        code: ContentErrorCode::DuplicateDef,
                        message: format!(
                            "duplicate {def_type} '{name}'; each defName may be defined only once"
                        ),
                        file_path: file_path.to_path_buf(),
                        location: None,
                    });
                }
            }
        }
        Ok(())
    }
}

struct DocContext<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

fn parse_defs_document(file_path: &Path, raw: &str) -> Result<ParsedDefs, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let cx = DocContext {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(cx.error_at(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            root,
        ));
    }

    let mut defs = ParsedDefs::default();
    for child in root.children().filter(|node| node.is_element()) {
        match child.tag_name().name() {
            "SequenceDef" => defs.sequences.push(parse_sequence_def(&cx, child)?),
            "ChaserDef" => defs.chasers.push(parse_chaser_def(&cx, child)?),
            "StalkerDef" => defs.stalkers.push(parse_stalker_def(&cx, child)?),
            "DialogueZoneDef" => defs.dialogue_zones.push(parse_dialogue_zone_def(&cx, child)?),
            other => {
                return Err(cx.error_at(
                    ContentErrorCode::UnknownDefType,
                    format!(
                        "unsupported def type <{other}>; expected <SequenceDef>, <ChaserDef>, <StalkerDef> or <DialogueZoneDef>"
                    ),
                    child,
                ))
            }
        }
    }

    Ok(defs)
}

fn parse_sequence_def(
    cx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<SequenceDef, ContentCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut def_name: Option<String> = None;
    let mut start_on_load = false;
    let mut steps: Option<Vec<StepDef>> = None;
    let mut activate_on_complete = Vec::new();
    let mut deactivate_on_complete = Vec::new();

    for field in element_children(node) {
        let field_name = cx.unique_field(&mut seen_fields, field, "SequenceDef")?;
        match field_name {
            "defName" => def_name = Some(cx.required_text(field, "defName")?),
            "startOnLoad" => start_on_load = cx.parse_bool(field, "startOnLoad")?,
            "steps" => {
                let mut parsed = Vec::new();
                let mut step_ids = HashSet::<String>::new();
                for item in cx.list_items(field, "steps")? {
                    let step = parse_step(cx, item)?;
                    if !step_ids.insert(step.step_id.clone()) {
                        return Err(cx.error_at(
                            ContentErrorCode::DuplicateStepId,
                            format!("duplicate stepId '{}' in <steps>", step.step_id),
                            item,
                        ));
                    }
                    parsed.push(step);
                }
                steps = Some(parsed);
            }
            "activateOnComplete" => {
                activate_on_complete = cx.text_list(field, "activateOnComplete")?;
            }
            "deactivateOnComplete" => {
                deactivate_on_complete = cx.text_list(field, "deactivateOnComplete")?;
            }
            _ => return Err(cx.unknown_field(field, "SequenceDef")),
        }
    }

    let Some(def_name) = def_name else {
        return Err(cx.missing_field(node, "defName", "SequenceDef"));
    };
    let Some(steps) = steps else {
        return Err(cx.missing_field(node, "steps", "SequenceDef"));
    };

    Ok(SequenceDef {
        def_name,
        start_on_load,
        steps,
        activate_on_complete,
        deactivate_on_complete,
    })
}

fn parse_step(cx: &DocContext<'_, '_>, node: Node<'_, '_>) -> Result<StepDef, ContentCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut step_id: Option<String> = None;
    let mut action: Option<StepActionKind> = None;
    let mut target: Option<String> = None;
    let mut requires_input = false;
    let mut description = String::new();
    let mut dialogue = Vec::new();

    for field in element_children(node) {
        let field_name = cx.unique_field(&mut seen_fields, field, "steps/li")?;
        match field_name {
            "stepId" => step_id = Some(cx.required_text(field, "stepId")?),
            "action" => {
                let value = cx.required_text(field, "action")?;
                let parsed = StepActionKind::parse(&value).ok_or_else(|| {
                    cx.error_at(
                        ContentErrorCode::InvalidValue,
                        format!(
                            "invalid action '{value}'; allowed values: Dialogue, Interaction, Pickup, UseStair"
                        ),
                        field,
                    )
                })?;
                action = Some(parsed);
            }
            "target" => target = Some(cx.required_text(field, "target")?),
            "requiresInput" => requires_input = cx.parse_bool(field, "requiresInput")?,
            "description" => description = optional_text(field),
            "dialogue" => dialogue = parse_dialogue_lines(cx, field, "dialogue")?,
            _ => return Err(cx.unknown_field(field, "steps/li")),
        }
    }

    let Some(step_id) = step_id else {
        return Err(cx.missing_field(node, "stepId", "steps/li"));
    };
    let Some(action) = action else {
        return Err(cx.missing_field(node, "action", "steps/li"));
    };

    Ok(StepDef {
        step_id,
        action,
        target,
        requires_input,
        description,
        dialogue,
    })
}

fn parse_dialogue_lines(
    cx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
    list_name: &str,
) -> Result<Vec<DialogueLineDef>, ContentCompileError> {
    let mut lines = Vec::new();
    for item in cx.list_items(node, list_name)? {
        let mut seen_fields = HashSet::<String>::new();
        let mut text: Option<String> = None;
        let mut play_once = false;
        for field in element_children(item) {
            let field_name = cx.unique_field(&mut seen_fields, field, "dialogue/li")?;
            match field_name {
                "text" => text = Some(cx.required_text(field, "text")?),
                "playOnce" => play_once = cx.parse_bool(field, "playOnce")?,
                _ => return Err(cx.unknown_field(field, "dialogue/li")),
            }
        }
        let Some(text) = text else {
            return Err(cx.missing_field(item, "text", "dialogue/li"));
        };
        lines.push(DialogueLineDef { text, play_once });
    }
    Ok(lines)
}

fn parse_chaser_def(
    cx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<ChaserDef, ContentCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut def = ChaserDef::with_defaults(String::new());
    let mut has_def_name = false;

    for field in element_children(node) {
        let field_name = cx.unique_field(&mut seen_fields, field, "ChaserDef")?;
        match field_name {
            "defName" => {
                def.def_name = cx.required_text(field, "defName")?;
                has_def_name = true;
            }
            "detectionRange" => def.detection_range = cx.parse_non_negative(field, field_name)?,
            "activationRange" => def.activation_range = cx.parse_non_negative(field, field_name)?,
            "attackRange" => def.attack_range = cx.parse_non_negative(field, field_name)?,
            "chaseSpeed" => def.chase_speed = cx.parse_non_negative(field, field_name)?,
            "returnSpeed" => def.return_speed = cx.parse_non_negative(field, field_name)?,
            "returnThreshold" => def.return_threshold = cx.parse_non_negative(field, field_name)?,
            "returnHomeWhenLost" => def.return_home_when_lost = cx.parse_bool(field, field_name)?,
            _ => return Err(cx.unknown_field(field, "ChaserDef")),
        }
    }

    if !has_def_name {
        return Err(cx.missing_field(node, "defName", "ChaserDef"));
    }
    if def.activation_range > def.detection_range {
        return Err(cx.error_at(
            ContentErrorCode::InvalidValue,
            format!(
                "activationRange {} must not exceed detectionRange {}",
                def.activation_range, def.detection_range
            ),
            node,
        ));
    }
    Ok(def)
}

fn parse_stalker_def(
    cx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<StalkerDef, ContentCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut def = StalkerDef::with_defaults(String::new());
    let mut has_def_name = false;

    for field in element_children(node) {
        let field_name = cx.unique_field(&mut seen_fields, field, "StalkerDef")?;
        match field_name {
            "defName" => {
                def.def_name = cx.required_text(field, "defName")?;
                has_def_name = true;
            }
            "normalSpeed" => def.normal_speed = cx.parse_non_negative(field, field_name)?,
            "retreatSpeed" => def.retreat_speed = cx.parse_non_negative(field, field_name)?,
            "attackRange" => def.attack_range = cx.parse_non_negative(field, field_name)?,
            "maxRepelDistance" => {
                def.max_repel_distance = cx.parse_non_negative(field, field_name)?
            }
            "retreatDistance" => def.retreat_distance = cx.parse_non_negative(field, field_name)?,
            "returnDelay" => def.return_delay = cx.parse_non_negative(field, field_name)?,
            "retreatSampleRadius" => {
                def.retreat_sample_radius = cx.parse_non_negative(field, field_name)?
            }
            _ => return Err(cx.unknown_field(field, "StalkerDef")),
        }
    }

    if !has_def_name {
        return Err(cx.missing_field(node, "defName", "StalkerDef"));
    }
    Ok(def)
}

fn parse_dialogue_zone_def(
    cx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<DialogueZoneDef, ContentCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut def_name: Option<String> = None;
    let mut zone: Option<String> = None;
    let mut radius = DEFAULT_DIALOGUE_ZONE_RADIUS;
    let mut extra_reading_time = DEFAULT_EXTRA_READING_TIME;
    let mut lines: Option<Vec<DialogueLineDef>> = None;

    for field in element_children(node) {
        let field_name = cx.unique_field(&mut seen_fields, field, "DialogueZoneDef")?;
        match field_name {
            "defName" => def_name = Some(cx.required_text(field, "defName")?),
            "zone" => zone = Some(cx.required_text(field, "zone")?),
            "radius" => radius = cx.parse_non_negative(field, field_name)?,
            "extraReadingTime" => extra_reading_time = cx.parse_non_negative(field, field_name)?,
            "lines" => lines = Some(parse_dialogue_lines(cx, field, "lines")?),
            _ => return Err(cx.unknown_field(field, "DialogueZoneDef")),
        }
    }

    let Some(def_name) = def_name else {
        return Err(cx.missing_field(node, "defName", "DialogueZoneDef"));
    };
    let Some(zone) = zone else {
        return Err(cx.missing_field(node, "zone", "DialogueZoneDef"));
    };
    let Some(lines) = lines else {
        return Err(cx.missing_field(node, "lines", "DialogueZoneDef"));
    };

    Ok(DialogueZoneDef {
        def_name,
        zone,
        radius,
        extra_reading_time,
        lines,
    })
}

fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

fn optional_text(node: Node<'_, '_>) -> String {
    node.text().map(str::trim).unwrap_or_default().to_string()
}

impl DocContext<'_, '_> {
    fn error_at(
        &self,
        code: ContentErrorCode,
        message: String,
        node: Node<'_, '_>,
    ) -> ContentCompileError {
        let pos = self.doc.text_pos_at(node.range().start);
        ContentCompileError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn unique_field<'input>(
        &self,
        seen_fields: &mut HashSet<String>,
        field: Node<'_, 'input>,
        owner: &str,
    ) -> Result<&'input str, ContentCompileError> {
        let field_name = field.tag_name().name();
        if !seen_fields.insert(field_name.to_string()) {
            return Err(self.error_at(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{field_name}> in <{owner}>"),
                field,
            ));
        }
        Ok(field_name)
    }

    fn unknown_field(&self, field: Node<'_, '_>, owner: &str) -> ContentCompileError {
        self.error_at(
            ContentErrorCode::UnknownField,
            format!("unknown field <{}> in <{owner}>", field.tag_name().name()),
            field,
        )
    }

    fn missing_field(&self, node: Node<'_, '_>, field_name: &str, owner: &str) -> ContentCompileError {
        self.error_at(
            ContentErrorCode::MissingField,
            format!("missing required field <{field_name}> in <{owner}>"),
            node,
        )
    }

    fn required_text(&self, node: Node<'_, '_>, field_name: &str) -> Result<String, ContentCompileError> {
        let value = optional_text(node);
        if value.is_empty() {
            return Err(self.error_at(
                ContentErrorCode::MissingField,
                format!("field <{field_name}> must not be empty"),
                node,
            ));
        }
        Ok(value)
    }

    fn parse_bool(&self, node: Node<'_, '_>, field_name: &str) -> Result<bool, ContentCompileError> {
        let value = self.required_text(node, field_name)?;
        match value.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{field_name} '{value}' must be true or false"),
                node,
            )),
        }
    }

    fn parse_non_negative(&self, node: Node<'_, '_>, field_name: &str) -> Result<f32, ContentCompileError> {
        let value = self.required_text(node, field_name)?;
        let parsed = value.parse::<f32>().map_err(|_| {
            self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{field_name} '{value}' is not a valid number"),
                node,
            )
        })?;
        if !parsed.is_finite() || parsed < 0.0 {
            return Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{field_name} must be finite and >= 0"),
                node,
            ));
        }
        Ok(parsed)
    }

    fn list_items<'a, 'input>(
        &self,
        node: Node<'a, 'input>,
        list_name: &str,
    ) -> Result<Vec<Node<'a, 'input>>, ContentCompileError> {
        let mut items = Vec::new();
        for item in element_children(node) {
            if item.tag_name().name() != "li" {
                return Err(self.error_at(
                    ContentErrorCode::UnknownField,
                    format!(
                        "<{list_name}> may only contain <li> entries, found <{}>",
                        item.tag_name().name()
                    ),
                    item,
                ));
            }
            items.push(item);
        }
        Ok(items)
    }

    fn text_list(&self, node: Node<'_, '_>, list_name: &str) -> Result<Vec<String>, ContentCompileError> {
        self.list_items(node, list_name)?
            .into_iter()
            .map(|item| self.required_text(item, "li"))
            .collect()
    }
}

struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<(String, PathBuf)>, ReadError> {
    let mut files = Vec::<(String, PathBuf)>::new();
    collect_recursive(root, root, &mut files)?;
    files.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(files)
}

fn collect_recursive(
    root: &Path,
    current: &Path,
    files: &mut Vec<(String, PathBuf)>,
) -> Result<(), ReadError> {
    let entries = fs::read_dir(current).map_err(|source| ReadError {
        path: current.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReadError {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(root, &path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            let rel = path.strip_prefix(root).unwrap_or(path.as_path());
            files.push((normalize_rel_path(rel), path.clone()));
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_error(path: PathBuf, source: std::io::Error) -> ContentCompileError {
    ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read XML file: {source}"),
        file_path: path,
        location: None,
    }
}
