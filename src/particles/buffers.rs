//! Double-buffered particle storage.
//!
//! Each system owns two mirror-image GPU buffers; every frame the simulate
//! kernel reads one and writes the other, then the roles swap. The same
//! arrangement exists in miniature for the 64-slot collision probe buffers.

use super::shaders::{COLLISION_PROBES, PARTICLE_STRIDE};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// One particle as laid out in GPU memory.
///
/// Matches the WGSL `Particle` struct: vec3 members are padded to 16 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct ParticleData {
    pub position: [f32; 3],
    _pad0: f32,
    pub velocity: [f32; 3],
    _pad1: f32,
}

impl ParticleData {
    pub fn new(position: [f32; 3], velocity: [f32; 3]) -> Self {
        Self {
            position,
            _pad0: 0.0,
            velocity,
            _pad1: 0.0,
        }
    }
}

/// A read/write pair with an explicit role state machine.
///
/// Exactly one side is the "read" (most recently simulated) state at any
/// time; [`BufferPair::swap`] flips the roles in O(1) without copying.
/// Swapping twice returns to the original assignment.
pub struct BufferPair<B> {
    a: B,
    b: B,
    a_is_read: bool,
}

impl<B> BufferPair<B> {
    pub fn new(a: B, b: B) -> Self {
        Self {
            a,
            b,
            a_is_read: true,
        }
    }

    /// The buffer holding the most recently simulated state.
    pub fn read(&self) -> &B {
        if self.a_is_read {
            &self.a
        } else {
            &self.b
        }
    }

    /// The buffer the next simulate step will write into.
    pub fn write(&self) -> &B {
        if self.a_is_read {
            &self.b
        } else {
            &self.a
        }
    }

    /// Exchange the read/write roles.
    pub fn swap(&mut self) {
        self.a_is_read = !self.a_is_read;
    }

    /// Whether side A currently holds the read role. Used to select the
    /// matching precomputed bind group.
    pub fn a_is_read(&self) -> bool {
        self.a_is_read
    }

    /// Side A regardless of current role (for building bind groups).
    pub fn side_a(&self) -> &B {
        &self.a
    }

    /// Side B regardless of current role.
    pub fn side_b(&self) -> &B {
        &self.b
    }
}

/// All GPU storage owned by one particle system: the main double buffer,
/// the probe double buffer, and a staging buffer for probe readback.
pub struct SystemBuffers {
    pub main: BufferPair<wgpu::Buffer>,
    pub probes: BufferPair<wgpu::Buffer>,
    pub staging: wgpu::Buffer,
}

impl SystemBuffers {
    /// Allocate and upload both buffer pairs.
    ///
    /// `initial` must hold one entry per particle; both sides of the main
    /// pair start from the same generated state. Allocation failure is
    /// unrecoverable (wgpu reports it via the device error scope).
    pub fn new(device: &wgpu::Device, initial: &[ParticleData]) -> Self {
        let particle_usage = wgpu::BufferUsages::VERTEX
            | wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_DST;

        let make_main = |label: &str| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(initial),
                usage: particle_usage,
            })
        };

        let probe_size = (COLLISION_PROBES as usize * PARTICLE_STRIDE) as wgpu::BufferAddress;
        let make_probe = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: probe_size,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        };

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Probe Staging Buffer"),
            size: probe_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            main: BufferPair::new(make_main("Particle Buffer A"), make_main("Particle Buffer B")),
            probes: BufferPair::new(make_probe("Probe Buffer A"), make_probe("Probe Buffer B")),
            staging,
        }
    }

    /// Swap both pairs together so probe queries always run against the
    /// orientation of the freshly simulated population.
    pub fn swap(&mut self) {
        self.main.swap();
        self.probes.swap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_data_matches_gpu_stride() {
        assert_eq!(std::mem::size_of::<ParticleData>(), PARTICLE_STRIDE);
    }

    #[test]
    fn test_swap_alternates_roles() {
        let mut pair = BufferPair::new('a', 'b');
        assert_eq!(*pair.read(), 'a');
        assert_eq!(*pair.write(), 'b');

        pair.swap();
        assert_eq!(*pair.read(), 'b');
        assert_eq!(*pair.write(), 'a');

        // Swapping twice returns to the original handle identity.
        pair.swap();
        assert_eq!(*pair.read(), 'a');
        assert!(pair.a_is_read());
    }

    #[test]
    fn test_roles_alternate_deterministically() {
        let mut pair = BufferPair::new(0, 1);
        for cycle in 0..10 {
            assert_eq!(*pair.read(), cycle % 2);
            pair.swap();
        }
    }

    #[test]
    fn test_read_and_write_never_alias() {
        let mut pair = BufferPair::new('x', 'y');
        for _ in 0..5 {
            assert_ne!(pair.read(), pair.write());
            pair.swap();
        }
    }
}
