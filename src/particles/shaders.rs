//! WGSL source generation for the simulate and render programs.
//!
//! Shaders are assembled from string templates with config-derived constants
//! prepended, one simulate kernel per system variant. Both kernels share the
//! same buffer interface: read the `src` particle array, write the `dst`
//! array, never in place. The collision kernel doubles as the proximity
//! probe evaluator when `compute_collision` is set.
//!
//! The per-particle "distance to nearest feature" measurement is stochastic:
//! each evaluation samples a handful of pseudo-random feature points of the
//! active figure. Replicated over 64 probe slots and min-reduced on the CPU,
//! this approximates the true nearest distance.

/// Bytes per particle in the GPU buffers (vec3 position + vec3 velocity,
/// each padded to 16 bytes per WGSL storage layout rules).
pub const PARTICLE_STRIDE: usize = 32;

/// Number of probe slots in each collision buffer.
pub const COLLISION_PROBES: u32 = 64;

/// Compute workgroup size for simulate dispatches.
pub const WORKGROUP_SIZE: u32 = 64;

/// Figure index of the path ribbon along the tunnel centerline.
pub const PATH_FIGURE: i32 = 0;
/// Figure indices at or above this select the final goal ball.
pub const FINAL_FIGURE: i32 = 20;

const SIM_PRELUDE: &str = r#"
const REF_FRAME_RATE: f32 = 60.0;
const PROBE_COUNT: u32 = 64u;
const NO_HIT: f32 = 1.0e6;

struct Particle {
    position: vec3<f32>,
    velocity: vec3<f32>,
}

struct SimUniforms {
    proj: mat4x4<f32>,
    view: mat4x4<f32>,
    inv_proj_view: mat4x4<f32>,
    time: f32,
    dt: f32,
    figure: i32,
    compute_collision: u32,
}

@group(0) @binding(0) var<storage, read> src: array<Particle>;
@group(0) @binding(1) var<storage, read_write> dst: array<Particle>;
@group(0) @binding(2) var<uniform> u: SimUniforms;

fn hash11(n: f32) -> f32 {
    return fract(sin(n * 127.1) * 43758.5453);
}

fn hash13(n: f32) -> vec3<f32> {
    return vec3<f32>(hash11(n), hash11(n + 17.17), hash11(n + 43.7));
}

fn is_finite3(v: vec3<f32>) -> bool {
    return all(v == v) && all(abs(v) < vec3<f32>(1.0e30));
}

// World position of a normalized-device-coordinate point, via the inverse
// of the frame's projection*view. Used to respawn particles in-frustum.
fn unproject(ndc: vec3<f32>) -> vec3<f32> {
    let w = u.inv_proj_view * vec4<f32>(ndc, 1.0);
    return w.xyz / w.w;
}
"#;

const FIGURE_FUNCTIONS: &str = r#"
const TAU: f32 = 6.28318530718;
const CELL: f32 = 30.0;

// Centerline of the tunnel the path ribbon follows.
fn tunnel_center(z: f32) -> vec3<f32> {
    return vec3<f32>(2.0 * sin(z * 0.11), 2.0 * cos(z * 0.17), z);
}

// One pseudo-random feature point of `figure`, sampled near depth
// `anchor_z`. seed is uniform in [0, 1).
fn figure_point(figure: i32, seed: f32, anchor_z: f32) -> vec3<f32> {
    if (figure == 0) {
        // Path ribbon: centerline points around the anchor depth.
        let z = anchor_z + (seed * 2.0 - 1.0) * 20.0;
        return tunnel_center(z);
    }
    if (figure >= 20) {
        // Final goal: a ball of features at the end of the tunnel.
        let dir = normalize(hash13(seed * 289.3) * 2.0 - 1.0);
        let r = 3.0 * pow(hash11(seed * 517.7), 0.3333);
        return vec3<f32>(0.0, 0.0, -FINAL_DIST) + dir * r;
    }

    // Obstacle figures: one shape per tunnel cell, built around the
    // centerline so the player has to leave the path to dodge it.
    let zc = (floor(anchor_z / CELL) + 0.5) * CELL;
    let center = tunnel_center(zc);
    let t = hash11(seed * 91.7);
    let phase = u.time * 0.3;
    var p = vec3<f32>(0.0);
    switch (figure) {
        case 1: {
            let a = t * TAU + phase;
            p = vec3<f32>(cos(a), sin(a), 0.0) * 1.8;
        }
        case 2: {
            let a = t * TAU;
            if (hash11(seed * 7.3) < 0.5) {
                p = vec3<f32>(cos(a + phase), sin(a + phase), 0.0) * 1.8;
            } else {
                p = vec3<f32>(cos(a - phase), 0.0, sin(a - phase)) * 1.8;
            }
        }
        case 3: {
            p = normalize(hash13(seed * 53.1) * 2.0 - 1.0) * 1.8;
        }
        case 4: {
            let a = t * TAU * 3.0 + phase;
            p = vec3<f32>(cos(a) * 1.5, sin(a) * 1.5, (t - 0.5) * CELL * 0.8);
        }
        case 5: {
            let side = select(-1.5, 1.5, hash11(seed * 3.3) < 0.5);
            p = vec3<f32>(side, (t * 2.0 - 1.0) * 2.5, 0.0);
        }
        case 6: {
            let a = t * TAU;
            let b = hash11(seed * 19.7) * TAU;
            let ring = 1.6 + 0.4 * cos(b);
            p = vec3<f32>(cos(a + phase) * ring, sin(a + phase) * ring, 0.4 * sin(b));
        }
        case 7: {
            // Annulus wall: a gap stays open around the centerline.
            let a = t * TAU;
            let r = 0.9 + hash11(seed * 117.9) * 1.8;
            p = vec3<f32>(cos(a) * r, sin(a) * r, 0.0);
        }
        default: {
            p = (hash13(seed * 217.3) * 2.0 - 1.0) * 2.2;
        }
    }
    return center + p;
}
"#;

const COLLISION_KERNEL: &str = r#"
fn particle_valid(pos: vec3<f32>) -> bool {
    if (!is_finite3(pos)) {
        return false;
    }
    let v = u.view * vec4<f32>(pos, 1.0);
    // Behind the camera or drifted out of range.
    return v.z < 2.0 && length(v.xyz) < 90.0;
}

fn respawn(index: u32) -> Particle {
    let r = hash13(f32(index) * 1.618 + fract(u.time * 0.37) * 57.0);
    // Drop back in just inside the far plane, anywhere in the frustum.
    var out: Particle;
    out.position = unproject(vec3<f32>(r.x * 2.0 - 1.0, r.y * 2.0 - 1.0, 0.995));
    out.velocity = (hash13(f32(index) * 7.77 + r.z * 11.1) * 2.0 - 1.0) * SPAWN_SPEED;
    return out;
}

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let index = global_id.x;
    if (index >= arrayLength(&src)) {
        return;
    }

    if (u.compute_collision == 1u) {
        // Probe mode: src holds replicated query positions; write the
        // distance estimate into position.x of the matching dst slot.
        if (index >= PROBE_COUNT) {
            return;
        }
        let probe = src[index].position;
        var best = NO_HIT;
        if (u.figure >= 0) {
            for (var k = 0u; k < 4u; k = k + 1u) {
                let seed = hash11(f32(index * 4u + k) * 0.917 + fract(u.time) * 31.7);
                best = min(best, distance(probe, figure_point(u.figure, seed, probe.z)));
            }
        }
        dst[index].position = vec3<f32>(best, 0.0, 0.0);
        dst[index].velocity = vec3<f32>(0.0);
        return;
    }

    var p = src[index];
    let frames = u.dt * REF_FRAME_RATE;

    // Retarget every couple of seconds so the figure keeps evolving.
    let epoch = floor(u.time * 0.5);
    let seed = hash11(f32(index) * 0.013 + epoch * 7.31);
    let goal = figure_point(u.figure, seed, p.position.z);

    let pull = (goal - p.position) * 0.06;
    p.velocity = mix(p.velocity, pull, clamp(0.12 * frames, 0.0, 1.0));
    p.position = p.position + p.velocity * frames;

    if (!particle_valid(p.position)) {
        p = respawn(index);
    }

    dst[index] = p;
}
"#;

const FLOATING_KERNEL: &str = r#"
fn particle_valid(pos: vec3<f32>) -> bool {
    if (!is_finite3(pos)) {
        return false;
    }
    let v = u.view * vec4<f32>(pos, 1.0);
    return v.z < 2.0 && length(v.xyz) < 150.0;
}

fn respawn(index: u32) -> Particle {
    let r = hash13(f32(index) * 1.618 + fract(u.time * 0.37) * 57.0);
    // Anywhere in the frustum, weighted toward the far end so dust
    // streams past the camera instead of popping in close.
    let depth = 0.3 + 0.7 * r.z;
    var out: Particle;
    out.position = unproject(vec3<f32>(r.x * 2.0 - 1.0, r.y * 2.0 - 1.0, depth));
    out.velocity = (hash13(f32(index) * 5.23 + r.x * 9.7) * 2.0 - 1.0) * FLOAT_SPEED;
    return out;
}

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let index = global_id.x;
    if (index >= arrayLength(&src)) {
        return;
    }

    var p = src[index];
    let frames = u.dt * REF_FRAME_RATE;

    // Free drift with a little wander.
    let jitter = hash13(f32(index) * 3.7 + floor(u.time)) * 2.0 - 1.0;
    p.velocity = p.velocity + jitter * 0.002 * frames;
    p.position = p.position + p.velocity * frames / REF_FRAME_RATE;

    if (!particle_valid(p.position)) {
        p = respawn(index);
    }

    dst[index] = p;
}
"#;

const RENDER_SHADER: &str = r#"
struct RenderUniforms {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    color: vec3<f32>,
    size: f32,
}

@group(0) @binding(0) var<uniform> u: RenderUniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) particle_pos: vec3<f32>,
) -> VertexOutput {
    var quad = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(-1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
    );
    let corner = quad[vertex_index];

    var clip = u.proj * u.view * vec4<f32>(particle_pos, 1.0);
    // Offset before the perspective divide, so the on-screen sprite size
    // falls off with distance like a point sprite.
    let aspect_inv = u.proj[0][0] / u.proj[1][1];
    clip.x = clip.x + corner.x * u.size * aspect_inv;
    clip.y = clip.y + corner.y * u.size;

    var out: VertexOutput;
    out.clip_position = clip;
    out.uv = corner;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let d = length(in.uv);
    if (d > 1.0) {
        discard;
    }
    let falloff = 1.0 - smoothstep(0.0, 1.0, d);
    return vec4<f32>(u.color * falloff, 1.0);
}
"#;

/// Simulate kernel for collision-type systems (path, obstacle, final).
pub fn collision_simulate_shader(final_dist: f32) -> String {
    format!(
        "const FINAL_DIST: f32 = {:.1};\nconst SPAWN_SPEED: f32 = 1.0;\n{}{}{}",
        final_dist, SIM_PRELUDE, FIGURE_FUNCTIONS, COLLISION_KERNEL
    )
}

/// Simulate kernel for the ambient floating system.
pub fn floating_simulate_shader(base_speed: f32) -> String {
    format!(
        "const FLOAT_SPEED: f32 = {:.3};\n{}{}",
        base_speed, SIM_PRELUDE, FLOATING_KERNEL
    )
}

/// Shared point-sprite render program.
pub fn render_shader() -> String {
    RENDER_SHADER.to_string()
}
