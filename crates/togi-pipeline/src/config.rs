//! Pipeline configuration.
//!
//! One struct per stage group rather than a single flat record: each
//! stage reads only its own group, every field has a default so a
//! partial mapping is always valid, and unknown or mistyped fields are
//! reported by the deserializer instead of being silently dropped.
//!
//! Boolean `enabled`-style flags gate the numeric fields that follow
//! them; a disabled group leaves the image untouched. Kernel fields that
//! must map to an odd window are stored as radii — a value of `N`
//! produces an actual window dimension of `2N + 1`.
//!
//! The configuration is immutable for the duration of one pipeline run.

use serde::{Deserialize, Serialize};

/// Color space the working image is converted into.
///
/// [`Rgb`](Self::Rgb) is the pass-through setting. The non-trivial
/// conversions remap a three-channel buffer in place; a single-channel
/// buffer passes through them unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorSpace {
    /// Keep the native R,G,B representation.
    #[default]
    Rgb,
    /// Reduce to a single luma channel (BT.601).
    Grayscale,
    /// Hue (0–179), saturation, value.
    Hsv,
    /// CIE L*a*b* with the usual 8-bit offsets.
    Lab,
    /// Luma plus scaled B−Y / R−Y chroma.
    Yuv,
    /// Luma plus blue-difference / red-difference chroma (BT.601).
    YCbCr,
}

/// Thresholding strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThresholdKind {
    /// Fixed global threshold: above the value becomes white.
    #[default]
    Binary,
    /// Fixed global threshold, inverted output.
    BinaryInv,
    /// Otsu's automatic threshold, binary output.
    Otsu,
    /// Per-pixel threshold from the local block mean minus an offset.
    AdaptiveMean,
    /// Per-pixel threshold from a Gaussian-weighted local mean minus an
    /// offset.
    AdaptiveGaussian,
}

/// Distance metric for the distance-transform stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceNorm {
    /// City-block distance.
    #[default]
    L1,
    /// Euclidean distance (chamfer approximation).
    L2,
    /// Chessboard distance.
    Chessboard,
}

/// Edge-preserving smoothing variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EdgeFilter {
    /// Separable row/column range filtering — fast.
    #[default]
    Recursive,
    /// Full-window normalized convolution — smoother.
    NormConv,
}

/// Crop to a bounding box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropConfig {
    /// Whether cropping is applied.
    pub enabled: bool,
    /// `(x1, y1, x2, y2)` corner coordinates. Clamped into the image;
    /// a missing or degenerate box makes the stage a no-op.
    pub bbox: Option<(i32, i32, i32, i32)>,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bbox: None,
        }
    }
}

/// Resize to a target extent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    /// Whether resizing is applied.
    pub enabled: bool,
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
    /// Scale both axes from whichever target yields the tighter fit,
    /// preserving the source aspect ratio.
    pub maintain_aspect_ratio: bool,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            width: 1920,
            height: 1080,
            maintain_aspect_ratio: true,
        }
    }
}

/// Color-space conversion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    /// Target color space for the working image.
    pub space: ColorSpace,
}

/// Gamma correction via a 256-entry lookup table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GammaConfig {
    /// Whether gamma correction is applied.
    pub enabled: bool,
    /// Gamma exponent. `1.0` is a no-op regardless of `enabled`.
    pub value: f64,
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            value: 1.0,
        }
    }
}

/// Denoising operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DenoiseConfig {
    /// Non-local means denoising.
    pub nl_means: bool,
    /// NL-means filter strength (`h`).
    pub strength: f32,
    /// Patch size for NL-means similarity, full odd width.
    pub template_window: u32,
    /// Search window for NL-means candidates, full odd width.
    pub search_window: u32,
    /// Edge-preserving smoothing.
    pub edge_preserving: bool,
    /// Which edge-preserving variant to run.
    pub edge_filter: EdgeFilter,
    /// Spatial sigma of the edge-preserving filter.
    pub edge_sigma_s: f32,
    /// Range sigma of the edge-preserving filter, 0–1.
    pub edge_sigma_r: f32,
    /// Iterated small-window bilateral smoothing.
    pub bilateral: bool,
    /// Number of bilateral iterations.
    pub bilateral_iterations: u32,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            nl_means: false,
            strength: 10.0,
            template_window: 7,
            search_window: 21,
            edge_preserving: false,
            edge_filter: EdgeFilter::default(),
            edge_sigma_s: 50.0,
            edge_sigma_r: 0.4,
            bilateral: false,
            bilateral_iterations: 1,
        }
    }
}

/// Linear and nonlinear filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Single-pass bilateral filter.
    pub bilateral: bool,
    /// Bilateral window diameter in pixels.
    pub bilateral_d: u32,
    /// Bilateral range sigma.
    pub bilateral_sigma_color: f32,
    /// Bilateral spatial sigma.
    pub bilateral_sigma_space: f32,
    /// Gaussian blur.
    pub gaussian: bool,
    /// Gaussian kernel radius; the window dimension is `2N + 1`.
    pub gaussian_kernel: u32,
    /// Gaussian sigma; non-positive derives it from the kernel size.
    pub gaussian_sigma: f64,
    /// Median filter.
    pub median: bool,
    /// Median kernel radius; the window dimension is `2N + 1`.
    pub median_kernel: u32,
    /// Morphological background estimation and subtraction.
    pub background_subtraction: bool,
    /// Constant bias added back after background subtraction.
    pub background_bias: u8,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            bilateral: false,
            bilateral_d: 9,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_space: 75.0,
            gaussian: false,
            gaussian_kernel: 3,
            gaussian_sigma: 0.0,
            median: false,
            median_kernel: 3,
            background_subtraction: false,
            background_bias: 50,
        }
    }
}

/// Histogram and contrast operations. All of these operate on
/// single-channel images only and pass color buffers through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistogramConfig {
    /// Global histogram equalization.
    pub equalization: bool,
    /// Contrast-limited adaptive histogram equalization.
    pub clahe: bool,
    /// CLAHE clip limit.
    pub clahe_clip_limit: f64,
    /// CLAHE tile grid size (N×N tiles).
    pub clahe_tile_size: u32,
    /// Plain adaptive equalization (CLAHE with clip limit 2.0).
    /// Only consulted when `clahe` is off.
    pub adaptive_eq: bool,
    /// Tile grid size for the adaptive-equalization variant.
    pub adaptive_eq_tile_size: u32,
    /// Multi-class Otsu quantization.
    pub multi_otsu: bool,
    /// Number of classes for multi-Otsu, 2–4.
    pub multi_otsu_classes: u32,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            equalization: false,
            clahe: false,
            clahe_clip_limit: 2.0,
            clahe_tile_size: 8,
            adaptive_eq: false,
            adaptive_eq_tile_size: 8,
            multi_otsu: false,
            multi_otsu_classes: 3,
        }
    }
}

/// Ruled-line removal via directional morphological opening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LineRemovalConfig {
    /// Remove vertical rules.
    pub vertical: bool,
    /// Height of the 1×N vertical structuring element.
    pub vertical_kernel: u32,
    /// Remove horizontal rules.
    pub horizontal: bool,
    /// Width of the N×1 horizontal structuring element.
    pub horizontal_kernel: u32,
}

impl Default for LineRemovalConfig {
    fn default() -> Self {
        Self {
            vertical: false,
            vertical_kernel: 3,
            horizontal: false,
            horizontal_kernel: 3,
        }
    }
}

/// Basic morphology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MorphologyConfig {
    /// Stroke-width normalization: iterated closing with a 2×2 ellipse.
    pub stroke_normalization: bool,
    /// Number of stroke-normalization iterations.
    pub stroke_iterations: u32,
    /// General open/close with an N×N ellipse.
    pub enabled: bool,
    /// Structuring-element size for the general pass.
    pub kernel_size: u32,
    /// Apply opening in the general pass.
    pub open: bool,
    /// Apply closing in the general pass.
    pub close: bool,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            stroke_normalization: false,
            stroke_iterations: 1,
            enabled: false,
            kernel_size: 2,
            open: true,
            close: true,
        }
    }
}

/// Character-shape operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CharacterConfig {
    /// Separate touching glyphs by opening with an ellipse.
    pub separation: bool,
    /// Structuring-element size for separation.
    pub separation_kernel: u32,
    /// Thicken glyphs by iterated dilation.
    pub dilation: bool,
    /// Structuring-element size for dilation.
    pub dilation_kernel: u32,
    /// Number of dilation iterations.
    pub dilation_iterations: u32,
    /// Thin glyphs by iterated erosion.
    pub erosion: bool,
    /// Structuring-element size for erosion.
    pub erosion_kernel: u32,
    /// Number of erosion iterations.
    pub erosion_iterations: u32,
    /// Remove small speckles. Requires a binary image.
    pub noise_dots: bool,
    /// Contours below this area are painted out.
    pub min_dot_area: f64,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            separation: false,
            separation_kernel: 1,
            dilation: false,
            dilation_kernel: 1,
            dilation_iterations: 1,
            erosion: false,
            erosion_kernel: 1,
            erosion_iterations: 1,
            noise_dots: false,
            min_dot_area: 10.0,
        }
    }
}

/// Enhancement operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnhanceConfig {
    /// Bridge gaps along text lines by directional closing.
    pub text: bool,
    /// Radius of the directional closing kernels (`2N + 1` long).
    pub text_kernel: u32,
    /// Detail enhancement: re-amplify the edge-preserving residual.
    pub detail: bool,
    /// Spatial sigma for detail smoothing.
    pub detail_sigma_s: f32,
    /// Range sigma for detail smoothing, 0–1.
    pub detail_sigma_r: f32,
    /// Overlay Canny edges onto the image.
    pub edges: bool,
    /// Weight of the edge overlay.
    pub edge_strength: f32,
    /// Unsharp masking against a Gaussian counterweight.
    pub unsharp: bool,
    /// Unsharp amount; the blurred image is weighted `1 − amount`.
    pub unsharp_strength: f32,
    /// 3×3 kernel sharpening.
    pub sharpen: bool,
    /// Blend factor between the original and the sharpened image.
    pub sharpen_strength: f32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            text: false,
            text_kernel: 1,
            detail: false,
            detail_sigma_s: 10.0,
            detail_sigma_r: 0.15,
            edges: false,
            edge_strength: 1.0,
            unsharp: false,
            unsharp_strength: 1.5,
            sharpen: false,
            sharpen_strength: 0.2,
        }
    }
}

/// Thresholding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdConfig {
    /// Whether thresholding is applied. Reduces color input to a single
    /// channel first.
    pub enabled: bool,
    /// Which thresholding strategy to run.
    pub kind: ThresholdKind,
    /// Fixed threshold value; also the Otsu fallback on degenerate input.
    pub value: u8,
    /// Adaptive block size; forced to the next odd integer.
    pub adaptive_block_size: u32,
    /// Constant subtracted from the local mean in the adaptive paths.
    pub adaptive_c: i32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: ThresholdKind::default(),
            value: 127,
            adaptive_block_size: 11,
            adaptive_c: 2,
        }
    }
}

/// Advanced morphology: top-hat, black-hat, gradient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdvancedMorphologyConfig {
    /// Top-hat: image minus its opening.
    pub tophat: bool,
    /// Structuring-element size for top-hat.
    pub tophat_kernel: u32,
    /// Black-hat: closing minus the image.
    pub blackhat: bool,
    /// Structuring-element size for black-hat.
    pub blackhat_kernel: u32,
    /// Morphological gradient: dilation minus erosion.
    pub gradient: bool,
    /// Structuring-element size for the gradient.
    pub gradient_kernel: u32,
    /// Secondary gradient toggle; only consulted when `gradient` is off.
    pub morph_gradient: bool,
    /// Structuring-element size for the secondary gradient.
    pub morph_gradient_kernel: u32,
}

impl Default for AdvancedMorphologyConfig {
    fn default() -> Self {
        Self {
            tophat: false,
            tophat_kernel: 3,
            blackhat: false,
            blackhat_kernel: 3,
            gradient: false,
            gradient_kernel: 3,
            morph_gradient: false,
            morph_gradient_kernel: 3,
        }
    }
}

/// Contour and connected-component filtering. Every operation in this
/// group requires a binary image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContourConfig {
    /// Keep only contours whose area falls in `[area_min, area_max]`.
    pub contour_filtering: bool,
    /// Minimum contour area, inclusive.
    pub area_min: f64,
    /// Maximum contour area, inclusive.
    pub area_max: f64,
    /// Keep only connected components whose pixel count falls in range.
    pub connected_components: bool,
    /// Minimum component pixel count, inclusive.
    pub component_min_area: u32,
    /// Maximum component pixel count, inclusive.
    pub component_max_area: u32,
    /// Keep only blobs whose bounding-box width/height ratio is in range.
    pub aspect_ratio: bool,
    /// Minimum aspect ratio, inclusive.
    pub aspect_min: f64,
    /// Maximum aspect ratio, inclusive.
    pub aspect_max: f64,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            contour_filtering: false,
            area_min: 50.0,
            area_max: 10000.0,
            connected_components: false,
            component_min_area: 20,
            component_max_area: 5000,
            aspect_ratio: false,
            aspect_min: 0.1,
            aspect_max: 10.0,
        }
    }
}

/// Structural operations: line erasure, normalization, distance
/// transform, skeletonization, watershed markers, local binary patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StructuralConfig {
    /// Erase straight foreground runs found by a Hough transform.
    pub hough_line_removal: bool,
    /// Hough accumulator vote threshold.
    pub hough_threshold: u32,
    /// Minimum foreground run length to erase, in pixels.
    pub hough_min_line_length: u32,
    /// Maximum gap bridged within one run, in pixels.
    pub hough_max_line_gap: u32,
    /// Linear min-max intensity normalization.
    pub normalize: bool,
    /// Lower bound of the normalized range.
    pub norm_min: u8,
    /// Upper bound of the normalized range.
    pub norm_max: u8,
    /// Percentile-based contrast stretching.
    pub contrast_stretch: bool,
    /// Lower percentile mapped to 0.
    pub stretch_min_percentile: f64,
    /// Upper percentile mapped to 255.
    pub stretch_max_percentile: f64,
    /// Distance transform of the binary foreground, normalized to 0–255.
    pub distance_transform: bool,
    /// Distance metric.
    pub distance_norm: DistanceNorm,
    /// Morphological skeletonization. Requires a binary image.
    pub skeletonize: bool,
    /// Upper bound on thinning iterations; the loop normally terminates
    /// when the eroded image runs out of foreground.
    pub skeleton_max_iterations: u32,
    /// Watershed seed markers: sure-background minus sure-foreground.
    pub watershed_markers: bool,
    /// Uniform local binary patterns, rescaled to 0–255.
    pub lbp: bool,
    /// LBP sampling circle radius.
    pub lbp_radius: u32,
    /// Number of LBP sampling points.
    pub lbp_points: u32,
}

impl Default for StructuralConfig {
    fn default() -> Self {
        Self {
            hough_line_removal: false,
            hough_threshold: 100,
            hough_min_line_length: 30,
            hough_max_line_gap: 10,
            normalize: false,
            norm_min: 0,
            norm_max: 255,
            contrast_stretch: false,
            stretch_min_percentile: 2.0,
            stretch_max_percentile: 98.0,
            distance_transform: false,
            distance_norm: DistanceNorm::default(),
            skeletonize: false,
            skeleton_max_iterations: 512,
            watershed_markers: false,
            lbp: false,
            lbp_radius: 3,
            lbp_points: 24,
        }
    }
}

/// Complete pipeline configuration: one group per stage, applied in the
/// canonical order (see [`crate::stage`]).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Crop stage.
    pub crop: CropConfig,
    /// Resize stage.
    pub resize: ResizeConfig,
    /// Color-space conversion stage.
    pub color: ColorConfig,
    /// Gamma-correction stage.
    pub gamma: GammaConfig,
    /// Denoising stage.
    pub denoise: DenoiseConfig,
    /// Filter stage.
    pub filter: FilterConfig,
    /// Histogram/contrast stage.
    pub histogram: HistogramConfig,
    /// Ruled-line removal stage.
    pub lines: LineRemovalConfig,
    /// Basic morphology stage.
    pub morphology: MorphologyConfig,
    /// Character-shape stage.
    pub character: CharacterConfig,
    /// Enhancement stage.
    pub enhance: EnhanceConfig,
    /// Threshold stage.
    pub threshold: ThresholdConfig,
    /// Advanced morphology stage.
    pub advanced_morphology: AdvancedMorphologyConfig,
    /// Contour-filtering stage.
    pub contour: ContourConfig,
    /// Structural stage.
    pub structural: StructuralConfig,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_every_stage_disabled() {
        let config = Config::default();
        assert!(!config.crop.enabled);
        assert!(!config.resize.enabled);
        assert_eq!(config.color.space, ColorSpace::Rgb);
        assert!(!config.gamma.enabled);
        assert!(!config.denoise.nl_means);
        assert!(!config.filter.gaussian);
        assert!(!config.histogram.clahe);
        assert!(!config.lines.vertical);
        assert!(!config.morphology.enabled);
        assert!(!config.character.noise_dots);
        assert!(!config.enhance.sharpen);
        assert!(!config.threshold.enabled);
        assert!(!config.advanced_morphology.tophat);
        assert!(!config.contour.contour_filtering);
        assert!(!config.structural.skeletonize);
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.resize.width, 1920);
        assert_eq!(config.resize.height, 1080);
        assert!(config.resize.maintain_aspect_ratio);
        assert!((config.gamma.value - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.filter.gaussian_kernel, 3);
        assert_eq!(config.threshold.value, 127);
        assert_eq!(config.threshold.adaptive_block_size, 11);
        assert_eq!(config.histogram.multi_otsu_classes, 3);
        assert_eq!(config.structural.lbp_points, 24);
        assert_eq!(config.structural.skeleton_max_iterations, 512);
    }

    #[test]
    fn partial_mapping_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"threshold": {"enabled": true, "value": 200}, "resize": {"width": 640}}"#,
        )
        .unwrap();
        assert!(config.threshold.enabled);
        assert_eq!(config.threshold.value, 200);
        // Untouched fields in a partially specified group keep defaults.
        assert_eq!(config.threshold.adaptive_block_size, 11);
        assert_eq!(config.resize.width, 640);
        assert_eq!(config.resize.height, 1080);
        // Untouched groups keep defaults too.
        assert!(!config.crop.enabled);
    }

    #[test]
    fn unknown_top_level_key_is_reported() {
        let result: Result<Config, _> = serde_json::from_str(r#"{"thresold": {}}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("thresold"), "error should name the key: {err}");
    }

    #[test]
    fn unknown_nested_key_is_reported() {
        let result: Result<Config, _> =
            serde_json::from_str(r#"{"threshold": {"enable": true}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn mistyped_field_is_reported() {
        let result: Result<Config, _> =
            serde_json::from_str(r#"{"threshold": {"value": "high"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn enums_round_trip_by_name() {
        let json = serde_json::to_string(&ColorSpace::YCbCr).unwrap();
        assert_eq!(json, "\"YCbCr\"");
        let back: ColorSpace = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ColorSpace::YCbCr);

        let kind: ThresholdKind = serde_json::from_str("\"AdaptiveGaussian\"").unwrap();
        assert_eq!(kind, ThresholdKind::AdaptiveGaussian);
    }

    #[test]
    fn config_round_trips_through_json() {
        let mut config = Config::default();
        config.crop.enabled = true;
        config.crop.bbox = Some((10, 10, 50, 50));
        config.threshold.kind = ThresholdKind::Otsu;
        config.structural.distance_norm = DistanceNorm::L2;
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
