//! The GPU driver seam.
//!
//! A driver owns real GPU objects and knows nothing about handles or guest
//! memory. The bridge resolves handles to driver objects and marshals guest
//! data before every call, and hands deleted objects back by value.

/// Parameters of a `texImage2D` upload, without the pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexImage2D {
    pub target: u32,
    pub level: i32,
    pub internal_format: i32,
    pub width: i32,
    pub height: i32,
    pub border: i32,
    pub format: u32,
    pub ty: u32,
}

/// Vertex attribute layout for `vertexAttribPointer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttribPointer {
    pub index: u32,
    pub size: i32,
    pub ty: u32,
    pub normalized: bool,
    pub stride: i32,
    pub offset: i32,
}

/// A WebGL2-style rendering context.
///
/// Bind calls take `None` to unbind. Uniform calls take `None` for the null
/// location and are expected to ignore the upload in that case.
///
/// Drivers and their objects are owned by the wasm store and must be `Send`.
pub trait GpuDriver: Send {
    type Shader: Send;
    type Program: Send;
    type Buffer: Send;
    type VertexArray: Send;
    type Texture: Send;
    type Framebuffer: Send;
    type UniformLocation: Send;

    /// Drawing buffer size in pixels.
    fn drawing_buffer_size(&self) -> (u32, u32);

    // Object lifetime
    fn create_shader(&mut self, ty: u32) -> Self::Shader;
    fn create_program(&mut self) -> Self::Program;
    fn create_buffer(&mut self) -> Self::Buffer;
    fn create_vertex_array(&mut self) -> Self::VertexArray;
    fn create_texture(&mut self) -> Self::Texture;
    fn create_framebuffer(&mut self) -> Self::Framebuffer;
    fn delete_shader(&mut self, shader: Self::Shader);
    fn delete_program(&mut self, program: Self::Program);
    fn delete_buffer(&mut self, buffer: Self::Buffer);
    fn delete_vertex_array(&mut self, vertex_array: Self::VertexArray);
    fn delete_texture(&mut self, texture: Self::Texture);
    fn delete_framebuffer(&mut self, framebuffer: Self::Framebuffer);
    fn is_shader(&mut self, shader: &Self::Shader) -> bool;
    fn is_program(&mut self, program: &Self::Program) -> bool;
    fn is_buffer(&mut self, buffer: &Self::Buffer) -> bool;
    fn is_texture(&mut self, texture: &Self::Texture) -> bool;
    fn is_framebuffer(&mut self, framebuffer: &Self::Framebuffer) -> bool;

    // Shaders and programs
    fn shader_source(&mut self, shader: &Self::Shader, source: &str);
    fn compile_shader(&mut self, shader: &Self::Shader);
    fn shader_parameter(&mut self, shader: &Self::Shader, pname: u32) -> i32;
    fn shader_info_log(&mut self, shader: &Self::Shader) -> String;
    fn attach_shader(&mut self, program: &Self::Program, shader: &Self::Shader);
    fn detach_shader(&mut self, program: &Self::Program, shader: &Self::Shader);
    fn link_program(&mut self, program: &Self::Program);
    fn program_parameter(&mut self, program: &Self::Program, pname: u32) -> i32;
    fn program_info_log(&mut self, program: &Self::Program) -> String;
    fn use_program(&mut self, program: Option<&Self::Program>);
    fn attrib_location(&mut self, program: &Self::Program, name: &str) -> i32;
    fn bind_attrib_location(&mut self, program: &Self::Program, index: u32, name: &str);
    fn uniform_location(&mut self, program: &Self::Program, name: &str)
        -> Option<Self::UniformLocation>;

    // Uniform uploads. `components` is the vector width (1..=4), `dim` the
    // matrix dimension (2..=4); `values` holds whole vectors or matrices.
    fn uniform_floats(
        &mut self,
        location: Option<&Self::UniformLocation>,
        components: usize,
        values: &[f32],
    );
    fn uniform_ints(
        &mut self,
        location: Option<&Self::UniformLocation>,
        components: usize,
        values: &[i32],
    );
    fn uniform_matrix(
        &mut self,
        location: Option<&Self::UniformLocation>,
        dim: usize,
        transpose: bool,
        values: &[f32],
    );

    // Bindings
    fn bind_buffer(&mut self, target: u32, buffer: Option<&Self::Buffer>);
    fn bind_vertex_array(&mut self, vertex_array: Option<&Self::VertexArray>);
    fn bind_texture(&mut self, target: u32, texture: Option<&Self::Texture>);
    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<&Self::Framebuffer>);
    fn active_texture(&mut self, unit: u32);

    // Data uploads
    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32);
    /// Allocate `size` bytes of zeroed storage for the bound buffer.
    fn buffer_data_size(&mut self, target: u32, size: u32, usage: u32);
    fn buffer_sub_data(&mut self, target: u32, offset: i32, data: &[u8]);
    fn tex_image_2d(&mut self, image: &TexImage2D, pixels: Option<&[u8]>);
    fn tex_parameter_f(&mut self, target: u32, pname: u32, param: f32);
    fn tex_parameter_i(&mut self, target: u32, pname: u32, param: i32);
    fn generate_mipmap(&mut self, target: u32);
    fn pixel_store_i(&mut self, pname: u32, param: i32);
    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        tex_target: u32,
        texture: Option<&Self::Texture>,
        level: i32,
    );
    fn check_framebuffer_status(&mut self, target: u32) -> u32;

    // Vertex state
    fn vertex_attrib_pointer(&mut self, layout: &AttribPointer);
    fn enable_vertex_attrib_array(&mut self, index: u32);
    fn disable_vertex_attrib_array(&mut self, index: u32);

    // Fixed-function state
    fn enable(&mut self, cap: u32);
    fn disable(&mut self, cap: u32);
    fn is_enabled(&mut self, cap: u32) -> bool;
    fn blend_func(&mut self, src: u32, dst: u32);
    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32);
    fn blend_equation(&mut self, mode: u32);
    fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32);
    fn blend_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    fn depth_func(&mut self, func: u32);
    fn depth_mask(&mut self, flag: bool);
    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool);
    fn stencil_func(&mut self, func: u32, reference: i32, mask: u32);
    fn stencil_mask(&mut self, mask: u32);
    fn stencil_op(&mut self, fail: u32, zfail: u32, zpass: u32);
    fn cull_face(&mut self, face: u32);
    fn front_face(&mut self, mode: u32);
    fn line_width(&mut self, width: f32);
    fn polygon_offset(&mut self, factor: f32, units: f32);
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);

    // Drawing
    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    fn clear_depth(&mut self, depth: f32);
    fn clear_stencil(&mut self, stencil: i32);
    fn clear(&mut self, mask: u32);
    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32);
    fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: i32);
    fn finish(&mut self);
    fn flush(&mut self);

    // Queries
    fn error(&mut self) -> u32;
    /// String-valued `getParameter` (vendor, renderer, version, ...).
    fn string_parameter(&mut self, name: u32) -> String;
}
