//! Resolution of ORSO sample models (the "simple model language") into a
//! flat list of layers.
//!
//! Only the subset the converter consumes is supported: `|`-separated
//! items of the form `name [thickness]`, `N ( ... )` repetitions, and names
//! that refer to `sub_stacks`, `layers` or `materials`. Any other name is
//! treated as a chemical formula.

use crate::orso::materials::known_sld;
use crate::orso::units::{Length, Quantity, Sld, DEFAULT_SLD_UNIT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

const DEFAULT_LENGTH_UNIT: &str = "nm";
const MAX_NESTING: usize = 16;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("empty stack")]
    EmptyStack,

    #[error("syntax error in stack '{stack}': {message}")]
    Syntax { stack: String, message: String },

    #[error("thickness given for sub-stack '{0}'")]
    SubStackThickness(String),

    #[error("sub-stack nesting deeper than {MAX_NESTING} levels at '{0}' (cyclic reference?)")]
    NestingTooDeep(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleModel {
    pub stack: String,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub sub_stacks: BTreeMap<String, SubStackDef>,
    #[serde(default)]
    pub layers: BTreeMap<String, LayerDef>,
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialDef>,
    #[serde(default)]
    pub globals: Option<ModelGlobals>,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubStackDef {
    pub stack: String,
    #[serde(default)]
    pub repetitions: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerDef {
    #[serde(default)]
    pub thickness: Option<Quantity>,
    #[serde(default)]
    pub roughness: Option<Quantity>,
    #[serde(default)]
    pub material: Option<MaterialRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaterialRef {
    Named(String),
    Inline(MaterialDef),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialDef {
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub sld: Option<SldValue>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SldValue {
    Real(f64),
    Complex {
        real: f64,
        #[serde(default)]
        imag: f64,
    },
    Value {
        magnitude: f64,
        #[serde(default)]
        unit: Option<String>,
    },
}

impl SldValue {
    fn to_sld(&self, default_unit: &str) -> Sld {
        match self {
            SldValue::Real(real) | SldValue::Complex { real, .. } => Sld {
                real: *real,
                unit: default_unit.to_string(),
            },
            SldValue::Value { magnitude, unit } => Sld {
                real: *magnitude,
                unit: unit.clone().unwrap_or_else(|| default_unit.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelGlobals {
    #[serde(default)]
    pub roughness: Option<Quantity>,
    #[serde(default)]
    pub length_unit: Option<String>,
    #[serde(default)]
    pub sld_unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMaterial {
    pub name: Option<String>,
    pub formula: Option<String>,
    pub sld: Option<Sld>,
}

/// One `(thickness, material, roughness)` entry of a resolved stack.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLayer {
    /// The stack item as written (layer key, material key or formula).
    pub original_name: Option<String>,
    pub thickness: Option<Length>,
    pub roughness: Option<Length>,
    pub material: ResolvedMaterial,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Pipe,
    Open,
    Close,
    Word(String),
}

#[derive(Debug, Clone, PartialEq)]
enum StackItem {
    Entry { name: String, thickness: Option<f64> },
    Repeat { count: u32, items: Vec<StackItem> },
}

fn tokenize(stack: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(word)));
        }
    };
    for c in stack.chars() {
        match c {
            '|' | '(' | ')' => {
                flush(&mut word, &mut tokens);
                tokens.push(match c {
                    '|' => Token::Pipe,
                    '(' => Token::Open,
                    _ => Token::Close,
                });
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            c => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

struct StackParser<'a> {
    stack: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> StackParser<'a> {
    fn parse(stack: &'a str) -> Result<Vec<StackItem>, ModelError> {
        let mut parser = Self {
            stack,
            tokens: tokenize(stack),
            pos: 0,
        };
        if parser.tokens.is_empty() {
            return Err(ModelError::EmptyStack);
        }
        let items = parser.sequence(0)?;
        if parser.pos < parser.tokens.len() {
            return Err(parser.error("unbalanced ')'"));
        }
        Ok(items)
    }

    fn error(&self, message: &str) -> ModelError {
        ModelError::Syntax {
            stack: self.stack.to_string(),
            message: message.to_string(),
        }
    }

    fn sequence(&mut self, depth: usize) -> Result<Vec<StackItem>, ModelError> {
        let mut items = vec![self.item(depth)?];
        while let Some(Token::Pipe) = self.tokens.get(self.pos) {
            self.pos += 1;
            items.push(self.item(depth)?);
        }
        Ok(items)
    }

    fn item(&mut self, depth: usize) -> Result<StackItem, ModelError> {
        let mut words = Vec::new();
        while let Some(Token::Word(w)) = self.tokens.get(self.pos) {
            words.push(w.clone());
            self.pos += 1;
        }

        if let Some(Token::Open) = self.tokens.get(self.pos) {
            if depth >= MAX_NESTING {
                return Err(self.error("repetitions nested too deeply"));
            }
            let count = match words.as_slice() {
                [n] => n
                    .parse::<u32>()
                    .map_err(|_| self.error(&format!("invalid repetition count '{}'", n)))?,
                _ => return Err(self.error("expected a repetition count before '('")),
            };
            self.pos += 1;
            let items = self.sequence(depth + 1)?;
            match self.tokens.get(self.pos) {
                Some(Token::Close) => self.pos += 1,
                _ => return Err(self.error("missing ')'")),
            }
            return Ok(StackItem::Repeat { count, items });
        }

        match words.len() {
            0 => Err(self.error("empty stack item")),
            1 => Ok(StackItem::Entry {
                name: words.remove(0),
                thickness: None,
            }),
            n => match words[n - 1].parse::<f64>() {
                Ok(thickness) => Ok(StackItem::Entry {
                    name: words[..n - 1].join(" "),
                    thickness: Some(thickness),
                }),
                Err(_) => Ok(StackItem::Entry {
                    name: words.join(" "),
                    thickness: None,
                }),
            },
        }
    }
}

impl SampleModel {
    pub fn length_unit(&self) -> &str {
        self.globals
            .as_ref()
            .and_then(|g| g.length_unit.as_deref())
            .unwrap_or(DEFAULT_LENGTH_UNIT)
    }

    fn sld_unit(&self) -> &str {
        self.globals
            .as_ref()
            .and_then(|g| g.sld_unit.as_deref())
            .unwrap_or(DEFAULT_SLD_UNIT)
    }

    pub fn resolve_to_layers(&self) -> Result<Vec<ResolvedLayer>, ModelError> {
        let items = StackParser::parse(&self.stack)?;
        let mut layers = Vec::new();
        self.expand(&items, 0, &mut layers)?;
        Ok(layers)
    }

    fn expand(
        &self,
        items: &[StackItem],
        depth: usize,
        out: &mut Vec<ResolvedLayer>,
    ) -> Result<(), ModelError> {
        for item in items {
            match item {
                StackItem::Repeat { count, items } => {
                    for _ in 0..*count {
                        self.expand(items, depth, out)?;
                    }
                }
                StackItem::Entry { name, thickness } => {
                    if let Some(sub) = self.sub_stacks.get(name) {
                        if thickness.is_some() {
                            return Err(ModelError::SubStackThickness(name.clone()));
                        }
                        if depth >= MAX_NESTING {
                            return Err(ModelError::NestingTooDeep(name.clone()));
                        }
                        let sub_items = StackParser::parse(&sub.stack)?;
                        for _ in 0..sub.repetitions.unwrap_or(1) {
                            self.expand(&sub_items, depth + 1, out)?;
                        }
                    } else {
                        out.push(self.resolve_entry(name, *thickness));
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve_entry(&self, name: &str, thickness: Option<f64>) -> ResolvedLayer {
        let unit = self.length_unit();
        let item_thickness = thickness.map(|t| Length::new(t, unit));
        let global_roughness = self
            .globals
            .as_ref()
            .and_then(|g| g.roughness.as_ref())
            .map(|r| r.to_length(unit));

        if let Some(layer) = self.layers.get(name) {
            let material = match &layer.material {
                Some(MaterialRef::Named(material)) => self.resolve_material(material),
                Some(MaterialRef::Inline(def)) => self.material_from_def(None, def),
                None => self.resolve_material(name),
            };
            return ResolvedLayer {
                original_name: Some(name.to_string()),
                thickness: item_thickness.or_else(|| layer.thickness.as_ref().map(|t| t.to_length(unit))),
                roughness: layer
                    .roughness
                    .as_ref()
                    .map(|r| r.to_length(unit))
                    .or(global_roughness),
                material,
            };
        }

        ResolvedLayer {
            original_name: Some(name.to_string()),
            thickness: item_thickness,
            roughness: global_roughness,
            material: self.resolve_material(name),
        }
    }

    fn resolve_material(&self, name: &str) -> ResolvedMaterial {
        match self.materials.get(name) {
            Some(def) => self.material_from_def(Some(name), def),
            None => ResolvedMaterial {
                name: Some(name.to_string()),
                formula: Some(name.to_string()),
                sld: known_sld(name).map(Sld::per_square_angstrom),
            },
        }
    }

    fn material_from_def(&self, name: Option<&str>, def: &MaterialDef) -> ResolvedMaterial {
        let sld = def.sld.as_ref().map(|s| s.to_sld(self.sld_unit())).or_else(|| {
            def.formula
                .as_deref()
                .or(name)
                .and_then(known_sld)
                .map(Sld::per_square_angstrom)
        });
        ResolvedMaterial {
            name: name.map(str::to_string).or_else(|| def.formula.clone()),
            formula: def.formula.clone(),
            sld,
        }
    }
}
