use std::sync::Arc;

use bevy::color::LinearRgba;
use bevy::log::{debug, info, warn};
use bevy::math::Vec3;
use constants::render_settings::{
    POINT_CLOUD_CHANNEL_BANDS, POINT_CLOUD_COLOUR, POINT_CLOUD_QUEUE_DEPTH,
};
use parking_lot::Mutex;

use crate::engine::render::{DrawContext, FrameContext, Layer, LayerCapabilities, Shape};
use crate::messages::sensor_msgs::{PointCloud2, PointField};
use crate::messages::{BusError, LocalBus, Subscription};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CloudColourMode {
    Flat(LinearRgba),
    /// Grey ramp over the value of one field, black at the range minimum
    /// and white at its maximum.
    Channel(usize),
}

/// The newest [`PointCloud2`] from one topic, drawn in its header frame.
///
/// Clouds land in a single-slot mailbox from the bus callback and are
/// decoded on the render thread in [`Layer::prepare`].
pub struct PointCloud2Layer {
    incoming: Arc<Mutex<Option<PointCloud2>>>,
    _subscription: Subscription,
    cloud: Option<PointCloud2>,
    colour_mode: CloudColourMode,
    range: (f32, f32),
    /// Points grouped by draw colour.
    batches: Vec<(Shape, LinearRgba)>,
    stale: bool,
    enabled: bool,
}

impl PointCloud2Layer {
    pub fn new(bus: &LocalBus, topic: &str) -> Result<Self, BusError> {
        let incoming = Arc::new(Mutex::new(None));
        let mailbox = incoming.clone();
        let subscription = bus.subscribe(topic, POINT_CLOUD_QUEUE_DEPTH, move |msg: &PointCloud2| {
            *mailbox.lock() = Some(msg.clone());
        })?;

        let [r, g, b, a] = POINT_CLOUD_COLOUR;
        Ok(Self {
            incoming,
            _subscription: subscription,
            cloud: None,
            colour_mode: CloudColourMode::Flat(LinearRgba::new(r, g, b, a)),
            range: (0.0, 1.0),
            batches: Vec::new(),
            stale: false,
            enabled: true,
        })
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn colour_mode(&self) -> CloudColourMode {
        self.colour_mode
    }

    pub fn set_flat_colour(&mut self, colour: LinearRgba) {
        info!("Point cloud colour mode set to flat {:?}", colour);
        self.colour_mode = CloudColourMode::Flat(colour);
        self.stale = true;
    }

    /// Colour by field `channel`; an index past the last field selects the
    /// first one.
    pub fn set_channel_colour(&mut self, channel: usize) {
        let channel = if channel < self.channel_names().len() {
            channel
        } else {
            0
        };
        info!("Point cloud colour mode set to channel {}", channel);
        self.colour_mode = CloudColourMode::Channel(channel);
        self.stale = true;
    }

    /// Field names of the current cloud, in field order.
    pub fn channel_names(&self) -> Vec<String> {
        self.cloud
            .as_ref()
            .map(|cloud| cloud.fields.iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn range(&self) -> (f32, f32) {
        self.range
    }

    pub fn set_range(&mut self, min: f32, max: f32) {
        self.range = (min, max);
        self.stale = true;
    }

    /// Scan the selected channel of the current cloud and adopt its extent
    /// as the colour range. `(0, 1)` when there is nothing to scan.
    pub fn compute_range(&mut self) -> (f32, f32) {
        let range = self
            .selected_field()
            .and_then(|(cloud, field)| channel_extent(cloud, field))
            .unwrap_or((0.0, 1.0));
        debug!("Computed point cloud range {} -> {}", range.0, range.1);
        self.set_range(range.0, range.1);
        range
    }

    pub fn point_count(&self) -> usize {
        self.batches
            .iter()
            .map(|(shape, _)| shape.pick_points().len())
            .sum()
    }

    fn selected_field(&self) -> Option<(&PointCloud2, &PointField)> {
        let CloudColourMode::Channel(channel) = self.colour_mode else {
            return None;
        };
        let cloud = self.cloud.as_ref()?;
        Some((cloud, cloud.fields.get(channel)?))
    }

    fn rebuild(&mut self) {
        self.stale = false;
        self.batches.clear();
        let Some(cloud) = &self.cloud else {
            return;
        };
        let (Some(x), Some(y), Some(z)) = (cloud.field("x"), cloud.field("y"), cloud.field("z"))
        else {
            warn!(
                "Point cloud in {} has no x/y/z fields, nothing to draw",
                cloud.header.frame_id
            );
            return;
        };

        let channel = self.selected_field().map(|(_, field)| field);
        let mut bands: Vec<(LinearRgba, Vec<Vec3>)> = match (self.colour_mode, channel) {
            (CloudColourMode::Channel(_), Some(_)) => (0..POINT_CLOUD_CHANNEL_BANDS)
                .map(|band| (band_grey(band), Vec::new()))
                .collect(),
            (CloudColourMode::Flat(colour), _) => vec![(colour, Vec::new())],
            (CloudColourMode::Channel(_), None) => vec![(LinearRgba::WHITE, Vec::new())],
        };

        let big_endian = cloud.is_bigendian;
        for record in cloud.records() {
            let position = (
                x.read(record, big_endian),
                y.read(record, big_endian),
                z.read(record, big_endian),
            );
            let (Some(px), Some(py), Some(pz)) = position else {
                continue;
            };
            let point = Vec3::new(px as f32, py as f32, pz as f32);
            if !point.is_finite() {
                continue;
            }
            let band = match channel {
                Some(field) => field
                    .read(record, big_endian)
                    .map_or(0, |value| band_of(value as f32, self.range)),
                None => 0,
            };
            bands[band].1.push(point);
        }

        self.batches = bands
            .into_iter()
            .filter(|(_, points)| !points.is_empty())
            .map(|(colour, points)| (Shape::Points(points), colour))
            .collect();
    }
}

/// Smallest and largest finite value of `field` over the cloud.
fn channel_extent(cloud: &PointCloud2, field: &PointField) -> Option<(f32, f32)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in cloud
        .records()
        .filter_map(|record| field.read(record, cloud.is_bigendian))
        .filter(|value| value.is_finite())
    {
        min = min.min(value);
        max = max.max(value);
    }
    (min <= max).then_some((min as f32, max as f32))
}

fn band_of(value: f32, (min, max): (f32, f32)) -> usize {
    let span = max - min;
    let level = if span > 0.0 {
        ((value - min) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    ((level * POINT_CLOUD_CHANNEL_BANDS as f32) as usize).min(POINT_CLOUD_CHANNEL_BANDS - 1)
}

fn band_grey(band: usize) -> LinearRgba {
    let grey = band as f32 / (POINT_CLOUD_CHANNEL_BANDS - 1) as f32;
    LinearRgba::new(grey, grey, grey, 1.0)
}

impl Layer for PointCloud2Layer {
    fn name(&self) -> &str {
        "PointCloud2"
    }

    fn capabilities(&self) -> LayerCapabilities {
        LayerCapabilities::DRAWABLE | LayerCapabilities::FRAME_ANCHORED
    }

    fn frame(&self) -> Option<&str> {
        self.cloud.as_ref().map(|cloud| cloud.header.frame_id.as_str())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn prepare(&mut self, _frame: &mut FrameContext<'_>) {
        if let Some(cloud) = self.incoming.lock().take() {
            debug!(
                "Point cloud of {} points in {}",
                cloud.point_count(),
                cloud.header.frame_id
            );
            self.cloud = Some(cloud);
            self.stale = true;
        }
        if self.stale {
            self.rebuild();
        }
    }

    fn draw(&self, ctx: &mut DrawContext<'_>) {
        for (shape, colour) in &self.batches {
            ctx.draw(shape, *colour);
        }
    }
}
