//! Frame-differencing motion detector
//!
//! Detects presence by comparing each frame against the previous one:
//! changed pixels form a binary mask, and a multiscale sliding-window search
//! over that mask produces candidate regions. A region only counts once
//! enough overlapping windows agree (`min_neighbors`), which rejects sensor
//! noise and compression shimmer.

use crate::capture::Frame;
use crate::detect::traits::{Detection, Detector, DetectorConfig};
use crate::utils::{CamError, CamResult};

/// Grayscale copy of one frame, kept between calls for differencing
struct LumaPlane {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

/// A raw window hit before neighbor agreement
#[derive(Debug, Clone, Copy)]
struct Hit {
    x: u32,
    y: u32,
    size: u32,
}

impl Hit {
    fn intersects(&self, other: &Cluster) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.size
            && self.y < other.y + other.height
            && other.y < self.y + self.size
    }
}

/// Union of overlapping hits
#[derive(Debug, Clone, Copy)]
struct Cluster {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    hits: u32,
}

impl Cluster {
    fn from_hit(hit: Hit) -> Self {
        Self {
            x: hit.x,
            y: hit.y,
            width: hit.size,
            height: hit.size,
            hits: 1,
        }
    }

    fn absorb(&mut self, hit: Hit) {
        let right = (self.x + self.width).max(hit.x + hit.size);
        let bottom = (self.y + self.height).max(hit.y + hit.size);
        self.x = self.x.min(hit.x);
        self.y = self.y.min(hit.y);
        self.width = right - self.x;
        self.height = bottom - self.y;
        self.hits += 1;
    }
}

/// Motion-based subject detector
pub struct MotionDetector {
    config: DetectorConfig,
    prev: Option<LumaPlane>,
}

impl MotionDetector {
    /// Create a detector; fails on invalid tuning
    pub fn new(config: DetectorConfig) -> CamResult<Self> {
        config.validate()?;
        Ok(Self { config, prev: None })
    }

    fn luma_plane(frame: &Frame) -> LumaPlane {
        let pixels = frame.width as usize * frame.height as usize;
        let mut data = Vec::with_capacity(pixels);
        for px in frame.data.chunks_exact(4) {
            // BT.601 integer weights
            let y = (77 * px[0] as u32 + 150 * px[1] as u32 + 29 * px[2] as u32) >> 8;
            data.push(y as u8);
        }
        LumaPlane {
            data,
            width: frame.width,
            height: frame.height,
        }
    }

    /// Summed-area table of the changed-pixel mask, (w+1)x(h+1)
    fn change_integral(&self, current: &LumaPlane, prev: &LumaPlane) -> Vec<u32> {
        let w = current.width as usize;
        let h = current.height as usize;
        let threshold = self.config.diff_threshold as i16;
        let mut integral = vec![0u32; (w + 1) * (h + 1)];

        for y in 0..h {
            let mut row_sum = 0u32;
            for x in 0..w {
                let a = current.data[y * w + x] as i16;
                let b = prev.data[y * w + x] as i16;
                if (a - b).abs() >= threshold {
                    row_sum += 1;
                }
                integral[(y + 1) * (w + 1) + (x + 1)] = integral[y * (w + 1) + (x + 1)] + row_sum;
            }
        }
        integral
    }

    fn window_sum(integral: &[u32], stride: usize, x: usize, y: usize, size: usize) -> u32 {
        let (x2, y2) = (x + size, y + size);
        integral[y2 * stride + x2] + integral[y * stride + x]
            - integral[y * stride + x2]
            - integral[y2 * stride + x]
    }

    /// Slide square windows over the mask at successively coarser scales
    fn scan(&self, integral: &[u32], width: u32, height: u32) -> Vec<Hit> {
        let stride = width as usize + 1;
        let mut hits = Vec::new();
        let mut window = self.config.min_window;

        while window <= width.min(height) {
            let step = (window / 4).max(1) as usize;
            let area = window as f64 * window as f64;
            let needed = (area * self.config.min_fill).ceil() as u32;

            let mut y = 0usize;
            while y + window as usize <= height as usize {
                let mut x = 0usize;
                while x + window as usize <= width as usize {
                    if Self::window_sum(integral, stride, x, y, window as usize) >= needed {
                        hits.push(Hit {
                            x: x as u32,
                            y: y as u32,
                            size: window,
                        });
                    }
                    x += step;
                }
                y += step;
            }

            let next = (window as f64 * self.config.scale_factor).round() as u32;
            window = next.max(window + 1);
        }
        hits
    }

    /// Greedy agreement: overlapping hits pool into clusters, and only
    /// clusters backed by at least `min_neighbors` hits survive
    fn cluster(&self, hits: Vec<Hit>) -> Vec<Detection> {
        let mut clusters: Vec<Cluster> = Vec::new();
        for hit in hits {
            match clusters.iter_mut().find(|c| hit.intersects(&**c)) {
                Some(cluster) => cluster.absorb(hit),
                None => clusters.push(Cluster::from_hit(hit)),
            }
        }

        clusters
            .into_iter()
            .filter(|c| c.hits >= self.config.min_neighbors)
            .map(|c| Detection {
                x: c.x,
                y: c.y,
                width: c.width,
                height: c.height,
            })
            .collect()
    }
}

impl Detector for MotionDetector {
    fn detect(&mut self, frame: &Frame) -> CamResult<Vec<Detection>> {
        if frame.data.len() != frame.expected_len() {
            return Err(CamError::Detection(format!(
                "unexpected frame buffer: {} bytes for {}x{}",
                frame.data.len(),
                frame.width,
                frame.height
            )));
        }

        let current = Self::luma_plane(frame);

        let detections = match &self.prev {
            Some(prev) if prev.width == current.width && prev.height == current.height => {
                let integral = self.change_integral(&current, prev);
                let hits = self.scan(&integral, current.width, current.height);
                self.cluster(hits)
            }
            // First frame, or the device renegotiated resolution: nothing to
            // compare against yet
            _ => Vec::new(),
        };

        self.prev = Some(current);
        Ok(detections)
    }
}
