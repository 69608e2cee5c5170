//! Attributed output layers
//!
//! One feature per completed segment in each valley-bottom layer, and one
//! feature per slope bin per bank in the hillslope layer. Field names follow
//! the layers downstream tools already read.

use crate::error::RunError;
use crate::hillslope::category_code;
use crate::pipeline::SegmentResult;
use geo_types::Geometry;
use hgvc_core::io::write_geojson;
use hgvc_core::vector::{Feature, FeatureCollection};
use std::path::{Path, PathBuf};
use tracing::info;

pub const HYDRO_GEO_FILE: &str = "ValleyBottom_HydroGeo.geojson";
pub const HYDROLOGIC_FILE: &str = "ValleyBottom_Hydro_Q100.geojson";
pub const GEOMORPHIC_FILE: &str = "ValleyBottom_Geo_BiS.geojson";
pub const HILLSLOPE_FILE: &str = "Hillslope_categories.geojson";

#[derive(Debug, Clone, Default)]
pub struct OutputLayers {
    pub hydro_geomorphic: FeatureCollection,
    pub hydrologic: FeatureCollection,
    pub geomorphic: FeatureCollection,
    pub hillslopes: FeatureCollection,
}

impl OutputLayers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a SegmentResult>) -> Self {
        let mut layers = Self::new();
        for r in results {
            layers.push(r);
        }
        layers
    }

    pub fn push(&mut self, r: &SegmentResult) {
        let b = &r.boundaries;
        let c = &r.classification;
        let s = &r.solution;

        self.hydro_geomorphic.push(
            Feature::new(Geometry::MultiPolygon(b.hydro_geomorphic.polygon.clone()))
                .with("ARCID", r.id)
                .with("S_Length", r.length)
                .with("BF_Width", r.bankfull_width)
                .with("Grad_Mean", r.gradient)
                .with("HG_V_Width", b.hydro_geomorphic.width)
                .with("V_BF_Ratio", c.width_ratio)
                .with("Coupling", c.coupling)
                .with("HS_L_Cat", category_code(r.hillslopes.left_category()))
                .with("HS_R_Cat", category_code(r.hillslopes.right_category()))
                .with("Min_Elev", r.min_elev)
                .with("Slope_Cl", r.slope_class)
                .with("Val_Class", c.valley_type.code())
                .with("Val_Cl_Abv", c.valley_type.abbreviation()),
        );

        self.hydrologic.push(
            Feature::new(Geometry::MultiPolygon(b.hydrologic.polygon.clone()))
                .with("ARCID", r.id)
                .with("S_Length", r.length)
                .with("BF_Width", r.bankfull_width)
                .with("Grad_Mean", r.gradient)
                .with("XC_Area", s.xc_area)
                .with("Hyd_Radius", s.hydraulic_radius)
                .with("Q100_calc", s.q_calc)
                .with("Depth_Q100", s.depth)
                .with("Width_Q100", b.hydrologic.width),
        );

        self.geomorphic.push(
            Feature::new(Geometry::MultiPolygon(b.geomorphic.polygon.clone()))
                .with("ARCID", r.id)
                .with("S_Length", r.length)
                .with("Depth_BiS", b.bis_depth)
                .with("Width_BiS", b.geomorphic.width),
        );

        for side in r.hillslopes.sides() {
            for bin in &side.bins {
                self.hillslopes.push(
                    Feature::new(Geometry::MultiPolygon(bin.polygon.clone()))
                        .with("ARCID", r.id)
                        .with("R_OR_L", side.side.as_str())
                        .with("GRIDCODE", i64::from(bin.class))
                        .with("Poly_Area", bin.area)
                        .with("HS_Cat", side.steepness.code()),
                );
            }
        }
    }

    /// Write the four layers into `dir`, returning the files written
    pub fn write(&self, dir: &Path) -> Result<Vec<PathBuf>, RunError> {
        let mut written = Vec::with_capacity(4);
        for (name, layer) in [
            (HYDRO_GEO_FILE, &self.hydro_geomorphic),
            (HYDROLOGIC_FILE, &self.hydrologic),
            (GEOMORPHIC_FILE, &self.geomorphic),
            (HILLSLOPE_FILE, &self.hillslopes),
        ] {
            let path = dir.join(name);
            write_geojson(layer, &path).map_err(|source| RunError::Output {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), features = layer.len(), "layer written");
            written.push(path);
        }
        Ok(written)
    }
}
