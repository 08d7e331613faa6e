//! Value-semantics launch configuration

use hsa_driver::StreamHandle;

use crate::error::Result;
use crate::geometry::{Dims, LaunchGeometry};

/// Geometry plus target stream for one launch call chain.
///
/// Every method takes `&self` and returns a new configuration; the receiver
/// is never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KernelConfiguration {
    geometry: LaunchGeometry,
    stream: Option<StreamHandle>,
}

impl KernelConfiguration {
    /// Global size `(1,)`, no local size, default queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration with resolved `global`/`local` sizes and `stream`.
    ///
    /// The stream is passed through unchecked; the binder validates it.
    pub fn configure(
        &self,
        global: impl Into<Dims>,
        local: Option<Dims>,
        stream: Option<StreamHandle>,
    ) -> Result<Self> {
        let geometry = LaunchGeometry::resolve(global.into(), local)?;
        Ok(self.with_geometry(geometry).with_stream(stream))
    }

    /// Configuration for `[grid, block, stream]` launch notation.
    pub fn configure_grid(
        &self,
        grid: impl Into<Dims>,
        block: impl Into<Dims>,
        stream: Option<StreamHandle>,
    ) -> Result<Self> {
        let geometry = LaunchGeometry::from_grid(grid.into(), block.into())?;
        Ok(self.with_geometry(geometry).with_stream(stream))
    }

    pub fn with_geometry(&self, geometry: LaunchGeometry) -> Self {
        Self {
            geometry,
            stream: self.stream,
        }
    }

    pub fn with_stream(&self, stream: Option<StreamHandle>) -> Self {
        Self {
            geometry: self.geometry.clone(),
            stream,
        }
    }

    pub fn geometry(&self) -> &LaunchGeometry {
        &self.geometry
    }

    pub fn global_size(&self) -> &Dims {
        self.geometry.global()
    }

    pub fn local_size(&self) -> Option<&Dims> {
        self.geometry.local()
    }

    pub fn stream(&self) -> Option<StreamHandle> {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LaunchError;

    #[test]
    fn test_defaults() {
        let config = KernelConfiguration::new();
        assert_eq!(config.global_size(), &Dims::from(1));
        assert_eq!(config.local_size(), None);
        assert_eq!(config.stream(), None);
    }

    #[test]
    fn test_configure_returns_new_value() {
        let base = KernelConfiguration::new();
        let before = base.clone();

        let configured = base.configure((4, 2), Some(Dims::from(2)), Some(StreamHandle::new(1))).unwrap();

        assert_eq!(base, before);
        assert_eq!(configured.global_size(), &Dims::from((4, 2)));
        assert_eq!(configured.local_size(), Some(&Dims::from((2, 1))));
        assert_eq!(configured.stream(), Some(StreamHandle::new(1)));
    }

    #[test]
    fn test_configure_grid() {
        let config = KernelConfiguration::new()
            .configure_grid((2, 3), (4, 5), None)
            .unwrap();
        assert_eq!(config.global_size(), &Dims::from((8, 15)));
        assert_eq!(config.local_size(), Some(&Dims::from((4, 5))));
    }

    #[test]
    fn test_failed_configure_leaves_receiver() {
        let base = KernelConfiguration::new().configure(8, None, None).unwrap();
        let err = base.configure(Vec::<u32>::new(), None, None).unwrap_err();
        assert!(matches!(err, LaunchError::InvalidGeometry(_)));
        assert_eq!(base.global_size(), &Dims::from(8));
    }

    #[test]
    fn test_with_stream_keeps_geometry() {
        let base = KernelConfiguration::new().configure(64, Some(Dims::from(16)), None).unwrap();
        let on_stream = base.with_stream(Some(StreamHandle::new(2)));
        assert_eq!(on_stream.geometry(), base.geometry());
        assert_eq!(on_stream.stream(), Some(StreamHandle::new(2)));
        assert_eq!(base.stream(), None);
    }
}
