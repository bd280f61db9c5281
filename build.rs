fn main() {
    // Rebuild when the embedded shaders change
    println!("cargo:rerun-if-changed=shaders/sphere_impostor.wgsl");
    println!("cargo:rerun-if-changed=shaders/lines.wgsl");
    println!("cargo:rerun-if-changed=shaders/substrate.wgsl");
    println!("cargo:rerun-if-changed=shaders/trail_tube.wgsl");
}
