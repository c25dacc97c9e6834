use image::GrayImage;

const HIST_SIZE: usize = 256;

/// Largest tile count accepted along either axis.
pub const MAX_TILES: u32 = 256;

/// Contrast-limited adaptive histogram equalization on 8-bit single channel images.
///
/// The image is split into a `tiles_x` x `tiles_y` grid. Each tile gets a clipped
/// equalization LUT, and every pixel is mapped through a bilinear blend of the
/// LUTs of the four nearest tile centers. Images not divisible by the grid are
/// padded on the bottom/right with reflect-101 borders for the LUT pass only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Clahe {
    clip_limit: f64,
    tiles_x: u32,
    tiles_y: u32,
}

impl Clahe {
    pub fn new(clip_limit: f64, tiles_x: u32, tiles_y: u32) -> Self {
        Self {
            clip_limit,
            tiles_x: tiles_x.clamp(1, MAX_TILES),
            tiles_y: tiles_y.clamp(1, MAX_TILES),
        }
    }

    pub fn clip_limit(&self) -> f64 {
        self.clip_limit
    }

    pub fn tile_grid(&self) -> (u32, u32) {
        (self.tiles_x, self.tiles_y)
    }

    pub fn apply(&self, src: &GrayImage) -> GrayImage {
        let (width, height) = src.dimensions();
        if width == 0 || height == 0 {
            return src.clone();
        }

        let (ext_w, ext_h) =
            if width % self.tiles_x == 0 && height % self.tiles_y == 0 {
                (width, height)
            } else {
                (
                    width + self.tiles_x - width % self.tiles_x,
                    height + self.tiles_y - height % self.tiles_y,
                )
            };
        let tile_w = ext_w / self.tiles_x;
        let tile_h = ext_h / self.tiles_y;
        let luts = self.build_luts(src, tile_w, tile_h);

        let inv_tw = 1.0f32 / tile_w as f32;
        let inv_th = 1.0f32 / tile_h as f32;
        let last_tx = self.tiles_x as i64 - 1;
        let last_ty = self.tiles_y as i64 - 1;

        let columns: Vec<(usize, usize, f32)> = (0..width)
            .map(|x| {
                let txf = x as f32 * inv_tw - 0.5;
                let tx1 = txf.floor() as i64;
                let xa = txf - tx1 as f32;
                let tx2 = (tx1 + 1).min(last_tx);
                (tx1.max(0) as usize, tx2 as usize, xa)
            })
            .collect();

        let mut dst = GrayImage::new(width, height);
        for y in 0..height {
            let tyf = y as f32 * inv_th - 0.5;
            let ty1 = tyf.floor() as i64;
            let ya = tyf - ty1 as f32;
            let ya1 = 1.0 - ya;
            let ty2 = (ty1 + 1).min(last_ty) as usize;
            let ty1 = ty1.max(0) as usize;
            let row1 = ty1 * self.tiles_x as usize;
            let row2 = ty2 * self.tiles_x as usize;

            for (x, &(tx1, tx2, xa)) in columns.iter().enumerate() {
                let v = src.get_pixel(x as u32, y).0[0] as usize;
                let xa1 = 1.0 - xa;
                let top = luts[row1 + tx1][v] as f32 * xa1 + luts[row1 + tx2][v] as f32 * xa;
                let bottom = luts[row2 + tx1][v] as f32 * xa1 + luts[row2 + tx2][v] as f32 * xa;
                let value = top * ya1 + bottom * ya;
                dst.put_pixel(x as u32, y, image::Luma([value.round().clamp(0.0, 255.0) as u8]));
            }
        }
        dst
    }

    fn build_luts(&self, src: &GrayImage, tile_w: u32, tile_h: u32) -> Vec<[u8; HIST_SIZE]> {
        let (width, height) = src.dimensions();
        let tile_area = (tile_w as usize) * (tile_h as usize);
        let clip = if self.clip_limit > 0.0 {
            Some(((self.clip_limit * tile_area as f64 / HIST_SIZE as f64) as usize).max(1))
        } else {
            None
        };
        let lut_scale = (HIST_SIZE - 1) as f32 / tile_area as f32;

        let mut luts = Vec::with_capacity((self.tiles_x * self.tiles_y) as usize);
        for ty in 0..self.tiles_y {
            for tx in 0..self.tiles_x {
                let mut hist = [0usize; HIST_SIZE];
                for dy in 0..tile_h {
                    let y = reflect_101((ty * tile_h + dy) as i64, height as i64);
                    for dx in 0..tile_w {
                        let x = reflect_101((tx * tile_w + dx) as i64, width as i64);
                        hist[src.get_pixel(x, y).0[0] as usize] += 1;
                    }
                }

                if let Some(clip) = clip {
                    clip_histogram(&mut hist, clip);
                }

                let mut lut = [0u8; HIST_SIZE];
                let mut sum = 0usize;
                for (slot, count) in lut.iter_mut().zip(hist.iter()) {
                    sum += count;
                    *slot = (sum as f32 * lut_scale).round().clamp(0.0, 255.0) as u8;
                }
                luts.push(lut);
            }
        }
        luts
    }
}

/// Clip bins above `clip` and spread the excess uniformly, leftovers at a fixed stride.
fn clip_histogram(hist: &mut [usize; HIST_SIZE], clip: usize) {
    let mut clipped = 0usize;
    for bin in hist.iter_mut() {
        if *bin > clip {
            clipped += *bin - clip;
            *bin = clip;
        }
    }

    let redist = clipped / HIST_SIZE;
    let mut residual = clipped - redist * HIST_SIZE;
    for bin in hist.iter_mut() {
        *bin += redist;
    }

    if residual > 0 {
        let step = (HIST_SIZE / residual).max(1);
        let mut i = 0;
        while i < HIST_SIZE && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

fn reflect_101(i: i64, n: i64) -> u32 {
    if n <= 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let m = i.rem_euclid(period);
    (if m < n { m } else { period - m }) as u32
}
