use crate::{
    app::errors::AppError,
    bundle::{Bundle, BundleSelector, Bundler},
    config::Config,
    images::{self, AsGiven, CompositeStyle, SourceChain, UnderRoot},
    partition::PartitionResolver,
    similarity::{self, Neighbor},
};

/// Entry point shared by the cli and the http service.
///
/// Holds no mutable state besides the similarity store cache, so one
/// instance serves concurrent requests.
pub struct App {
    config: Config,
    partitions: PartitionResolver,
    style: CompositeStyle,
    sources: SourceChain,
    bundler: Bundler,
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let partitions = PartitionResolver::new(&config)?;
        let style = config.export.style()?;

        let sources = config.fallback_roots.iter().fold(
            SourceChain::new().with(AsGiven {
                base: config.base_path().to_path_buf(),
            }),
            |chain, root| {
                chain.with(UnderRoot {
                    root: config.resolve(root),
                })
            },
        );

        let bundler = Bundler::new(config.resolve(&config.svg_root), config.svg_extension.clone());

        Ok(Self {
            config,
            partitions,
            style,
            sources,
            bundler,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    #[cfg(test)]
    pub fn partitions(&self) -> &PartitionResolver {
        &self.partitions
    }

    /// Qualified identifiers of the logos of `selector`.
    pub fn logos(&self, selector: &str) -> Result<Vec<String>, AppError> {
        self.partitions.list_identifiers(selector)
    }

    /// Neighbors of `target` within `selector`, best first.
    ///
    /// A partition without similarity data has no neighbors.
    pub fn similar(&self, selector: &str, target: &str) -> Result<Vec<Neighbor>, AppError> {
        match self.partitions.load(selector) {
            Ok(resolved) => Ok(similarity::neighbors(&resolved.store, target, &resolved.prefix)),
            Err(AppError::NotFound(selector)) => {
                log::warn!("no similarity data for partition {selector:?}");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    pub fn categories(&self) -> Vec<String> {
        self.partitions.list_partitions()
    }

    /// PNG with the logos side by side, in the given order.
    pub fn compose(&self, idents: &[String]) -> Result<Vec<u8>, AppError> {
        images::compose(idents, &self.style, &self.sources)
    }

    pub fn bundle(&self, selector: &BundleSelector) -> Result<Bundle, AppError> {
        self.bundler.bundle(selector)
    }
}
