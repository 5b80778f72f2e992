// src/image/neuquant.rs

//! NeuQuant neural-net color quantization.
//!
//! A Kohonen self-organizing map of 256 neurons is trained on a sampled
//! subset of the frame's pixels. Each neuron becomes one palette entry.
//! After training, neurons are sorted on their green component so that
//! nearest-color lookups can start at the right place and stop early.
//!
//! Reference: Anthony Dekker, "Kohonen neural networks for optimal colour
//! quantization", Network: Computation in Neural Systems 5 (1994) 351-367.
//!
//! All learning state lives on the [`NeuQuant`] value; there are no globals,
//! so two quantizers can run side by side.

use crate::image::image_formats::Pixel;
use crate::image::palette::{PALETTE_COLORS, Palette};
use log::trace;

const NETSIZE: usize = PALETTE_COLORS;
const MAXNETPOS: usize = NETSIZE - 1;
const NCYCLES: usize = 100;

// Color values are kept scaled up by this many bits while learning.
const NETBIASSHIFT: i32 = 4;

// Frequency and bias are fixed point with 16 fractional bits.
const INTBIASSHIFT: i32 = 16;
const INTBIAS: i32 = 1 << INTBIASSHIFT;
const GAMMASHIFT: i32 = 10;
const BETASHIFT: i32 = 10;
const BETA: i32 = INTBIAS >> BETASHIFT;
const BETAGAMMA: i32 = INTBIAS << (GAMMASHIFT - BETASHIFT);

// Neighbourhood radius starts at 32 (biased by 6 bits) and shrinks by 1/30 per cycle.
const INITRAD: i32 = (NETSIZE >> 3) as i32;
const RADIUSBIASSHIFT: i32 = 6;
const RADIUSBIAS: i32 = 1 << RADIUSBIASSHIFT;
const INITRADIUS: i32 = INITRAD * RADIUSBIAS;
const RADIUSDEC: i32 = 30;

// Learning rate starts at 1.0 biased by 10 bits.
const ALPHABIASSHIFT: i32 = 10;
const INITALPHA: i32 = 1 << ALPHABIASSHIFT;

const RADBIASSHIFT: i32 = 8;
const RADBIAS: i32 = 1 << RADBIASSHIFT;
const ALPHARADBSHIFT: i32 = ALPHABIASSHIFT + RADBIASSHIFT;
const ALPHARADBIAS: i64 = 1 << ALPHARADBSHIFT;

// Four primes near 500. No frame is assumed to have a byte length divisible by all four.
const PRIMES: [usize; 4] = [499, 491, 487, 503];

/// Inputs shorter than this are learned from every pixel.
pub const MIN_PICTURE_BYTES: usize = 3 * PRIMES[3];

/// A neuron: scaled r, g, b plus its original position (set after learning).
type Neuron = [i32; 4];

/// A trained quantizer for a single frame.
pub struct NeuQuant {
    network: Vec<Neuron>,
    netindex: [usize; 256],
    bias: Vec<i32>,
    freq: Vec<i32>,
    radpower: Vec<i32>,
    sample_factor: usize,
}

impl NeuQuant {
    /// Trains a network on `pixels` (interleaved RGB bytes).
    ///
    /// `sample_factor` trades speed for fidelity: 1 presents every pixel,
    /// larger values present roughly one in `sample_factor`. Values below 1
    /// are treated as 1.
    pub fn new(sample_factor: u32, pixels: &[u8]) -> Self {
        let mut nq = NeuQuant {
            network: Vec::with_capacity(NETSIZE),
            netindex: [0; 256],
            bias: vec![0; NETSIZE],
            freq: vec![INTBIAS / NETSIZE as i32; NETSIZE],
            radpower: vec![0; NETSIZE],
            sample_factor: sample_factor.max(1) as usize,
        };
        nq.init_network();
        nq.learn(pixels);
        nq.unbias();
        nq.build_index();
        nq
    }

    /// Spreads the neurons evenly along the gray diagonal.
    fn init_network(&mut self) {
        self.network.clear();
        for i in 0..NETSIZE {
            let v = ((i as i32) << (NETBIASSHIFT + 8)) / NETSIZE as i32;
            self.network.push([v, v, v, 0]);
        }
    }

    fn learn(&mut self, pixels: &[u8]) {
        let lengthcount = pixels.len() - pixels.len() % 3;
        if lengthcount == 0 {
            return;
        }

        let mut sample_factor = self.sample_factor;
        if lengthcount < MIN_PICTURE_BYTES {
            sample_factor = 1;
        }
        let alphadec = 30 + ((sample_factor as i32 - 1) / 3);
        let samplepixels = lengthcount / (3 * sample_factor);
        let delta = (samplepixels / NCYCLES).max(1);

        let mut alpha = INITALPHA;
        let mut radius = INITRADIUS;
        let mut rad = radius >> RADIUSBIASSHIFT;
        if rad <= 1 {
            rad = 0;
        }
        self.update_radpower(alpha, rad);

        let step = if lengthcount < MIN_PICTURE_BYTES {
            3
        } else {
            3 * PRIMES
                .iter()
                .copied()
                .find(|&p| lengthcount % p != 0)
                .unwrap_or(PRIMES[3])
        };

        trace!(
            "neuquant: {} bytes, {} samples, step {}, alphadec {}",
            lengthcount, samplepixels, step, alphadec
        );

        let mut pix = 0usize;
        for i in 1..=samplepixels {
            let r = (pixels[pix] as i32) << NETBIASSHIFT;
            let g = (pixels[pix + 1] as i32) << NETBIASSHIFT;
            let b = (pixels[pix + 2] as i32) << NETBIASSHIFT;

            let winner = self.contest(r, g, b);
            self.alter_single(alpha, winner, r, g, b);
            if rad != 0 {
                self.alter_neighbours(rad, winner, r, g, b);
            }

            pix = (pix + step) % lengthcount;

            if i % delta == 0 {
                alpha -= alpha / alphadec;
                radius -= radius / RADIUSDEC;
                rad = radius >> RADIUSBIASSHIFT;
                if rad <= 1 {
                    rad = 0;
                }
                self.update_radpower(alpha, rad);
            }
        }
    }

    fn update_radpower(&mut self, alpha: i32, rad: i32) {
        let rad_sq = rad * rad;
        for (i, power) in self.radpower.iter_mut().enumerate().take(rad as usize) {
            let i = i as i32;
            *power = alpha * (((rad_sq - i * i) * RADBIAS) / rad_sq);
        }
    }

    /// Finds the closest neuron and updates every neuron's frequency and bias.
    ///
    /// Returns the neuron with the smallest bias-adjusted distance, which
    /// steers learning away from neurons that keep winning.
    fn contest(&mut self, r: i32, g: i32, b: i32) -> usize {
        let mut bestd = i32::MAX;
        let mut bestbiasd = i32::MAX;
        let mut bestpos = 0;
        let mut bestbiaspos = 0;

        for i in 0..NETSIZE {
            let n = &self.network[i];
            let dist = (n[0] - r).abs() + (n[1] - g).abs() + (n[2] - b).abs();
            if dist < bestd {
                bestd = dist;
                bestpos = i;
            }
            let biasdist = dist - (self.bias[i] >> (INTBIASSHIFT - NETBIASSHIFT));
            if biasdist < bestbiasd {
                bestbiasd = biasdist;
                bestbiaspos = i;
            }
            let betafreq = self.freq[i] >> BETASHIFT;
            self.freq[i] -= betafreq;
            self.bias[i] += betafreq << GAMMASHIFT;
        }
        self.freq[bestpos] += BETA;
        self.bias[bestpos] -= BETAGAMMA;
        bestbiaspos
    }

    /// Moves neuron `i` towards (r, g, b) by `alpha / INITALPHA`.
    fn alter_single(&mut self, alpha: i32, i: usize, r: i32, g: i32, b: i32) {
        let n = &mut self.network[i];
        n[0] -= (alpha * (n[0] - r)) / INITALPHA;
        n[1] -= (alpha * (n[1] - g)) / INITALPHA;
        n[2] -= (alpha * (n[2] - b)) / INITALPHA;
    }

    /// Moves the neighbours of neuron `i` within `rad` by the precomputed
    /// `radpower[distance]`, which falls off quadratically with distance.
    fn alter_neighbours(&mut self, rad: i32, i: usize, r: i32, g: i32, b: i32) {
        let center = i as i32;
        let lo = (center - rad).max(-1);
        let hi = (center + rad).min(NETSIZE as i32);

        let mut j = center + 1;
        let mut k = center - 1;
        let mut m = 1usize;

        while j < hi || k > lo {
            let a = self.radpower[m] as i64;
            m += 1;

            if j < hi {
                if a != 0 {
                    move_towards(&mut self.network[j as usize], a, r, g, b);
                }
                j += 1;
            }
            if k > lo {
                if a != 0 {
                    move_towards(&mut self.network[k as usize], a, r, g, b);
                }
                k -= 1;
            }
        }
    }

    /// Scales neurons back to byte range and tags each with its position.
    fn unbias(&mut self) {
        for (i, n) in self.network.iter_mut().enumerate() {
            n[0] = (n[0] >> NETBIASSHIFT).clamp(0, 255);
            n[1] = (n[1] >> NETBIASSHIFT).clamp(0, 255);
            n[2] = (n[2] >> NETBIASSHIFT).clamp(0, 255);
            n[3] = i as i32;
        }
    }

    /// Sorts the network on green and fills `netindex[g]` with a starting
    /// position for lookups of that green value.
    fn build_index(&mut self) {
        self.network.sort_by_key(|n| n[1]);

        let mut previouscol = 0usize;
        let mut startpos = 0usize;
        for i in 0..NETSIZE {
            let smallval = self.network[i][1] as usize;
            if smallval != previouscol {
                self.netindex[previouscol] = (startpos + i) >> 1;
                for slot in &mut self.netindex[previouscol + 1..smallval] {
                    *slot = i;
                }
                previouscol = smallval;
                startpos = i;
            }
        }
        self.netindex[previouscol] = (startpos + MAXNETPOS) >> 1;
        for slot in &mut self.netindex[previouscol + 1..] {
            *slot = MAXNETPOS;
        }
    }

    /// Returns the learned palette in original neuron order.
    pub fn palette(&self) -> Palette {
        let mut colors = vec![Pixel::black(); NETSIZE];
        for n in &self.network {
            colors[n[3] as usize] = Pixel::new(n[0] as u8, n[1] as u8, n[2] as u8);
        }
        Palette::from_colors(colors)
    }

    /// Returns the palette index closest to (r, g, b).
    ///
    /// Searches outward from `netindex[g]` in both directions. A direction is
    /// abandoned once the green difference alone reaches the best distance
    /// found so far. Distance is the sum of absolute channel differences.
    pub fn index_of(&self, r: u8, g: u8, b: u8) -> u8 {
        let (r, g, b) = (r as i32, g as i32, b as i32);
        // Larger than any possible distance (3 * 255).
        let mut bestd = 1000;
        let mut best = 0;

        let mut i = self.netindex[g as usize];
        let mut j = i as isize - 1;

        while i < NETSIZE || j >= 0 {
            if i < NETSIZE {
                let p = &self.network[i];
                let mut dist = p[1] - g;
                if dist >= bestd {
                    i = NETSIZE;
                } else {
                    i += 1;
                    dist = dist.abs() + (p[0] - r).abs();
                    if dist < bestd {
                        dist += (p[2] - b).abs();
                        if dist < bestd {
                            bestd = dist;
                            best = p[3];
                        }
                    }
                }
            }
            if j >= 0 {
                let p = &self.network[j as usize];
                let mut dist = g - p[1];
                if dist >= bestd {
                    j = -1;
                } else {
                    j -= 1;
                    dist = dist.abs() + (p[0] - r).abs();
                    if dist < bestd {
                        dist += (p[2] - b).abs();
                        if dist < bestd {
                            bestd = dist;
                            best = p[3];
                        }
                    }
                }
            }
        }
        best as u8
    }

    /// Convenience wrapper over [`index_of`](Self::index_of).
    #[inline]
    pub fn index_of_pixel(&self, pixel: Pixel) -> u8 {
        self.index_of(pixel.r, pixel.g, pixel.b)
    }
}

fn move_towards(n: &mut Neuron, a: i64, r: i32, g: i32, b: i32) {
    n[0] -= ((a * (n[0] - r) as i64) / ALPHARADBIAS) as i32;
    n[1] -= ((a * (n[1] - g) as i64) / ALPHARADBIAS) as i32;
    n[2] -= ((a * (n[2] - b) as i64) / ALPHARADBIAS) as i32;
}

/// Learns a 256-color palette from interleaved RGB bytes.
pub fn build_palette(pixels: &[u8], sample_factor: u32) -> Palette {
    NeuQuant::new(sample_factor, pixels).palette()
}
