//! In-memory hosts and a small postfix evaluator shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cabpanel_core::prelude::*;
use cabpanel_core::host::{TextureHandle, TextureParameters};

/// Files known by path, with their pixel sizes.
#[derive(Debug, Default)]
pub struct FakeTrain {
    pub images: HashMap<PathBuf, (u32, u32)>,
}

impl FakeTrain {
    pub fn with_image(mut self, path: &str, width: u32, height: u32) -> Self {
        self.images.insert(PathBuf::from(path), (width, height));
        self
    }
}

impl FileLocator for FakeTrain {
    fn file_exists(&self, path: &Path) -> bool {
        self.images.contains_key(path)
    }

    fn combine_path(&self, base: &Path, relative: &Path) -> PathBuf {
        base.join(relative)
    }

    fn compatibility_file(&self, name: &str) -> PathBuf {
        Path::new("compat").join(name)
    }
}

/// Texture registry over the image sizes of a [`FakeTrain`].
#[derive(Debug, Default)]
pub struct FakeTextures {
    pub sizes: HashMap<PathBuf, (u32, u32)>,
    pub registered: Vec<(PathBuf, TextureParameters, (u32, u32))>,
}

impl FakeTextures {
    pub fn for_train(train: &FakeTrain) -> Self {
        Self {
            sizes: train.images.clone(),
            registered: Vec::new(),
        }
    }
}

impl TextureProvider for FakeTextures {
    fn register_texture(&mut self, path: &Path, params: &TextureParameters) -> Option<TextureHandle> {
        let (w, h) = *self.sizes.get(path)?;
        let size = match params.clip {
            Some(clip) => (clip.width.min(w), clip.height.min(h)),
            None => (w, h),
        };
        self.registered.push((path.to_path_buf(), params.clone(), size));
        Some(TextureHandle(self.registered.len() - 1))
    }

    fn texture_dimensions(&self, handle: TextureHandle) -> Option<(u32, u32)> {
        self.registered.get(handle.0).map(|r| r.2)
    }

    fn image_dimensions(&self, path: &Path) -> Option<(u32, u32)> {
        self.sizes.get(path).copied()
    }
}

/// Everything one compile produced.
pub struct Compiled {
    pub outcome: PanelOutcome,
    pub elements: Vec<PanelElement>,
    pub log: DiagnosticLog,
    pub textures: FakeTextures,
}

impl Compiled {
    pub fn kinds(&self) -> Vec<ElementKind> {
        self.elements.iter().map(|e| e.kind).collect()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.log.entries.iter().filter(|d| d.kind == kind).count()
    }
}

/// Compile `text` as `train/<file>` against `train`.
pub fn compile_text(file: &str, text: &str, train: &FakeTrain, options: &CompileOptions) -> Compiled {
    compile_with_signal(file, text, train, options, &mut CancelFlag::default())
}

pub fn compile_with_signal(
    file: &str,
    text: &str,
    train: &FakeTrain,
    options: &CompileOptions,
    signal: &mut dyn LoadSignal,
) -> Compiled {
    let source = PanelSource::from_str(Path::new("train").join(file), "train", text);
    let mut textures = FakeTextures::for_train(train);
    let mut sections = CarSections::new(1);
    let mut log = DiagnosticLog::default();
    let outcome = {
        let mut ctx = LoadContext {
            textures: &mut textures,
            files: train,
            sink: &mut sections,
            diagnostics: &mut log,
            signal,
        };
        compile_panel(&source, options, &mut ctx)
    };
    Compiled {
        outcome,
        elements: sections.elements(options.car).to_vec(),
        log,
        textures,
    }
}

/// Evaluate a postfix expression with the operators the builders emit.
///
/// Unknown words are looked up in `vars`. Returns `None` on stack underflow or
/// an unknown word.
pub fn eval(expression: &str, vars: &HashMap<&str, f64>) -> Option<f64> {
    let mut stack: Vec<f64> = Vec::new();
    for word in expression.split_whitespace() {
        let value = match word {
            "+" | "-" | "*" | "/" | "mod" => {
                let b = stack.pop()?;
                let a = stack.pop()?;
                match word {
                    "+" => a + b,
                    "-" => a - b,
                    "*" => a * b,
                    "/" => a / b,
                    _ => a.rem_euclid(b),
                }
            }
            "fma" => {
                let c = stack.pop()?;
                let b = stack.pop()?;
                let a = stack.pop()?;
                a.mul_add(b, c)
            }
            "abs" => stack.pop()?.abs(),
            "floor" => stack.pop()?.floor(),
            _ => match word.parse::<f64>() {
                Ok(n) => n,
                Err(_) => *vars.get(word)?,
            },
        };
        stack.push(value);
    }
    if stack.len() == 1 {
        stack.pop()
    } else {
        None
    }
}
