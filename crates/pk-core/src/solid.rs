//! Lazily generated solid parts
//!
//! A [`Solid`] pairs a configuration with a generator. The engine is created
//! on first use, the generator runs at most once, and the resulting shape is
//! cached for every later request.

use pk_cad::{CadEngine, CadResult, Shape};

use crate::config::SolidConfig;

/// Builds a shape with the engine it is given
pub trait Generate {
    fn generate(&self, engine: &dyn CadEngine) -> CadResult<Shape>;
}

impl<F> Generate for F
where
    F: Fn(&dyn CadEngine) -> CadResult<Shape>,
{
    fn generate(&self, engine: &dyn CadEngine) -> CadResult<Shape> {
        self(engine)
    }
}

/// Entry in a solid's part list
#[derive(Debug)]
pub enum PartEntry {
    Solid(Solid),
    /// Sub-parts of a part added earlier, kept one level down
    Nested(Vec<PartEntry>),
}

impl PartEntry {
    /// Every solid in this entry, depth first
    pub fn solids(&self) -> Vec<&Solid> {
        match self {
            PartEntry::Solid(solid) => vec![solid],
            PartEntry::Nested(entries) => entries.iter().flat_map(PartEntry::solids).collect(),
        }
    }
}

/// A named, buildable unit of geometry with optional sub-parts
pub struct Solid {
    pub(crate) config: SolidConfig,
    pub(crate) engine: Option<Box<dyn CadEngine>>,
    pub(crate) shape: Option<Shape>,
    generator: Box<dyn Generate>,
    pub(crate) parts: Vec<PartEntry>,
}

impl std::fmt::Debug for Solid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solid")
            .field("name", &self.config.name)
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .field("shape", &self.shape)
            .field("parts", &self.parts)
            .finish()
    }
}

impl Solid {
    /// Create an unconfigured solid
    pub fn new(config: SolidConfig, generator: impl Generate + 'static) -> Self {
        Self {
            config,
            engine: None,
            shape: None,
            generator: Box::new(generator),
            parts: Vec::new(),
        }
    }

    /// Create a solid from a closure over the engine
    pub fn from_fn<F>(config: SolidConfig, generator: F) -> Self
    where
        F: Fn(&dyn CadEngine) -> CadResult<Shape> + 'static,
    {
        Self::new(config, generator)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SolidConfig {
        &self.config
    }

    /// Change the configuration. Has no effect on an engine or shape that
    /// already exists.
    pub fn config_mut(&mut self) -> &mut SolidConfig {
        &mut self.config
    }

    pub fn is_configured(&self) -> bool {
        self.engine.is_some()
    }

    pub fn is_generated(&self) -> bool {
        self.shape.is_some()
    }

    /// The cached shape, if generated
    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    /// The engine, if configured
    pub fn engine(&self) -> Option<&dyn CadEngine> {
        self.engine.as_deref()
    }

    /// Instantiate the configured engine if not done yet
    pub fn configure(&mut self) -> &dyn CadEngine {
        let config = &self.config;
        let engine = self.engine.get_or_insert_with(|| {
            tracing::debug!(
                "Configuring {} with {} engine at fidelity {}",
                config.name,
                config.engine.code(),
                config.fidelity.code()
            );
            config.engine.instantiate(config.fidelity)
        });
        &**engine
    }

    /// Build the shape on first call and return the cached handle afterwards
    pub fn generate(&mut self) -> CadResult<Shape> {
        if let Some(shape) = &self.shape {
            return Ok(shape.clone());
        }
        self.configure();
        let Some(engine) = self.engine.as_deref() else {
            return Err(pk_cad::CadError::KernelNotAvailable(format!(
                "{} has no engine",
                self.config.name
            )));
        };

        tracing::info!("Generating {}", self.config.name);
        let mut shape = self.generator.generate(engine)?;
        if let Some(color) = self.config.color {
            shape = shape.with_color(color);
        }
        if shape.name.is_none() {
            shape = shape.with_name(self.config.name.clone());
        }
        self.shape = Some(shape.clone());
        Ok(shape)
    }

    /// Attach a sub-part. Its own sub-parts move into a single nested entry
    /// right after it.
    pub fn add_part(&mut self, mut part: Solid) {
        let nested = std::mem::take(&mut part.parts);
        self.parts.push(PartEntry::Solid(part));
        if !nested.is_empty() {
            self.parts.push(PartEntry::Nested(nested));
        }
    }

    pub fn parts(&self) -> &[PartEntry] {
        &self.parts
    }

    /// Every sub-part at any depth
    pub fn all_parts(&self) -> Vec<&Solid> {
        self.parts.iter().flat_map(PartEntry::solids).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pk_cad::{EngineKind, Fidelity};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cube(name: &str) -> Solid {
        Solid::from_fn(SolidConfig::new(name), |engine| engine.cuboid(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_generate_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut solid = Solid::from_fn(SolidConfig::new("block"), move |engine| {
            counter.fetch_add(1, Ordering::SeqCst);
            engine.cuboid(2.0, 2.0, 2.0)
        });
        assert!(!solid.is_configured());

        let first = solid.generate().unwrap();
        let second = solid.generate().unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(solid.is_generated());
    }

    #[test]
    fn test_configure_uses_config() {
        let config = SolidConfig::new("block")
            .with_engine(EngineKind::Null)
            .with_fidelity(Fidelity::High);
        let mut solid = cube("block");
        *solid.config_mut() = config;
        let engine = solid.configure();
        assert_eq!(engine.kind(), EngineKind::Null);
        assert_eq!(engine.fidelity(), Fidelity::High);
        assert!(solid.generate().is_err());
        assert!(!solid.is_generated());
    }

    #[test]
    fn test_configure_keeps_first_engine() {
        let mut solid = cube("block");
        assert_eq!(solid.configure().fidelity(), Fidelity::Medium);
        solid.config_mut().fidelity = Fidelity::Low;
        assert_eq!(solid.configure().fidelity(), Fidelity::Medium);
        assert!(solid.is_configured());
        assert_eq!(solid.engine().map(|e| e.kind()), Some(EngineKind::Csg));
    }

    #[test]
    fn test_generate_applies_color_and_name() {
        let mut solid = Solid::from_fn(
            SolidConfig::new("knob").with_color([200, 10, 10]),
            |engine| engine.sphere(3.0),
        );
        let shape = solid.generate().unwrap();
        assert_eq!(shape.color, Some([200, 10, 10]));
        assert_eq!(shape.name.as_deref(), Some("knob"));
    }

    #[test]
    fn test_add_part_moves_sub_parts_into_nested_entry() {
        let mut arm = cube("arm");
        arm.add_part(cube("finger"));
        arm.add_part(cube("thumb"));

        let mut body = cube("body");
        body.add_part(arm);
        body.add_part(cube("head"));

        assert_eq!(body.parts().len(), 3);
        assert!(matches!(&body.parts()[0], PartEntry::Solid(s) if s.parts().is_empty()));
        assert!(matches!(&body.parts()[1], PartEntry::Nested(entries) if entries.len() == 2));
        let names: Vec<&str> = body.all_parts().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["arm", "finger", "thumb", "head"]);
    }
}
