//! A driver without a GPU.
//!
//! Objects are plain ids, state changes are recorded as call strings, and the
//! few queries a guest relies on during start-up (compile and link status,
//! uniform lookup, string parameters) give plausible answers.

use crate::consts;
use crate::driver::{AttribPointer, GpuDriver, TexImage2D};
use std::collections::{HashMap, HashSet};

/// Number of recent calls a [`HeadlessDriver`] keeps by default.
pub const CALL_HISTORY: usize = 4096;

/// Driver-side id of a headless object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u32);

#[derive(Debug, Default)]
struct ShaderState {
    source: String,
    compiled: bool,
}

#[derive(Debug, Default)]
struct ProgramState {
    shaders: Vec<ObjectId>,
    linked: bool,
    uniforms: HashMap<String, ObjectId>,
}

/// Records every state-changing call and keeps just enough object state to
/// answer queries.
#[derive(Debug)]
pub struct HeadlessDriver {
    width: u32,
    height: u32,
    next_id: u32,
    live: HashSet<ObjectId>,
    shaders: HashMap<ObjectId, ShaderState>,
    programs: HashMap<ObjectId, ProgramState>,
    enabled: HashSet<u32>,
    calls: Vec<String>,
    history: usize,
    call_count: u64,
    draw_calls: usize,
}

impl Default for HeadlessDriver {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

impl HeadlessDriver {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            next_id: 1,
            live: HashSet::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            enabled: HashSet::new(),
            calls: Vec::new(),
            history: CALL_HISTORY,
            call_count: 0,
            draw_calls: 0,
        }
    }

    /// Keep at most `history` recent calls. At least one call is kept.
    pub fn with_history(mut self, history: usize) -> Self {
        self.history = history.max(1);
        self
    }

    /// Recently recorded calls, oldest first. Older calls are discarded once
    /// the history limit is reached.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    /// Number of calls recorded since creation, including discarded ones.
    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    /// Forget recorded calls.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of `drawArrays`/`drawElements` calls so far.
    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    /// Number of objects created and not yet deleted.
    pub fn live_objects(&self) -> usize {
        self.live.len()
    }

    pub fn shader_source_of(&self, shader: ObjectId) -> Option<&str> {
        self.shaders.get(&shader).map(|state| state.source.as_str())
    }

    fn record(&mut self, call: String) {
        if self.calls.len() >= self.history {
            // Discard the older half in one go.
            let excess = self.calls.len() + 1 - self.history.div_ceil(2);
            self.calls.drain(..excess);
        }
        self.calls.push(call);
        self.call_count += 1;
    }

    fn create(&mut self, kind: &str) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.live.insert(id);
        self.record(format!("create{}() -> {}", kind, id.0));
        id
    }

    fn delete(&mut self, kind: &str, id: ObjectId) {
        self.live.remove(&id);
        self.record(format!("delete{}({})", kind, id.0));
    }
}

fn id_of(object: Option<&ObjectId>) -> u32 {
    object.map_or(0, |id| id.0)
}

impl GpuDriver for HeadlessDriver {
    type Shader = ObjectId;
    type Program = ObjectId;
    type Buffer = ObjectId;
    type VertexArray = ObjectId;
    type Texture = ObjectId;
    type Framebuffer = ObjectId;
    type UniformLocation = ObjectId;

    fn drawing_buffer_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn create_shader(&mut self, _ty: u32) -> ObjectId {
        let id = self.create("Shader");
        self.shaders.insert(id, ShaderState::default());
        id
    }

    fn create_program(&mut self) -> ObjectId {
        let id = self.create("Program");
        self.programs.insert(id, ProgramState::default());
        id
    }

    fn create_buffer(&mut self) -> ObjectId {
        self.create("Buffer")
    }

    fn create_vertex_array(&mut self) -> ObjectId {
        self.create("VertexArray")
    }

    fn create_texture(&mut self) -> ObjectId {
        self.create("Texture")
    }

    fn create_framebuffer(&mut self) -> ObjectId {
        self.create("Framebuffer")
    }

    fn delete_shader(&mut self, shader: ObjectId) {
        self.shaders.remove(&shader);
        self.delete("Shader", shader);
    }

    fn delete_program(&mut self, program: ObjectId) {
        self.programs.remove(&program);
        self.delete("Program", program);
    }

    fn delete_buffer(&mut self, buffer: ObjectId) {
        self.delete("Buffer", buffer);
    }

    fn delete_vertex_array(&mut self, vertex_array: ObjectId) {
        self.delete("VertexArray", vertex_array);
    }

    fn delete_texture(&mut self, texture: ObjectId) {
        self.delete("Texture", texture);
    }

    fn delete_framebuffer(&mut self, framebuffer: ObjectId) {
        self.delete("Framebuffer", framebuffer);
    }

    fn is_shader(&mut self, shader: &ObjectId) -> bool {
        self.shaders.contains_key(shader)
    }

    fn is_program(&mut self, program: &ObjectId) -> bool {
        self.programs.contains_key(program)
    }

    fn is_buffer(&mut self, buffer: &ObjectId) -> bool {
        self.live.contains(buffer)
    }

    fn is_texture(&mut self, texture: &ObjectId) -> bool {
        self.live.contains(texture)
    }

    fn is_framebuffer(&mut self, framebuffer: &ObjectId) -> bool {
        self.live.contains(framebuffer)
    }

    fn shader_source(&mut self, shader: &ObjectId, source: &str) {
        if let Some(state) = self.shaders.get_mut(shader) {
            state.source = source.to_string();
            state.compiled = false;
        }
        self.record(format!("shaderSource({}, {} bytes)", shader.0, source.len()));
    }

    fn compile_shader(&mut self, shader: &ObjectId) {
        if let Some(state) = self.shaders.get_mut(shader) {
            state.compiled = !state.source.trim().is_empty();
        }
        self.record(format!("compileShader({})", shader.0));
    }

    fn shader_parameter(&mut self, shader: &ObjectId, pname: u32) -> i32 {
        let Some(compiled) = self.shaders.get(shader).map(|state| state.compiled) else {
            return 0;
        };
        match pname {
            consts::COMPILE_STATUS => compiled as i32,
            consts::INFO_LOG_LENGTH => self.shader_info_log(shader).len() as i32,
            _ => 0,
        }
    }

    fn shader_info_log(&mut self, shader: &ObjectId) -> String {
        match self.shaders.get(shader) {
            Some(state) if !state.compiled && state.source.trim().is_empty() => {
                "ERROR: 0:1: empty shader source".to_string()
            }
            _ => String::new(),
        }
    }

    fn attach_shader(&mut self, program: &ObjectId, shader: &ObjectId) {
        if let Some(state) = self.programs.get_mut(program) {
            state.shaders.push(*shader);
        }
        self.record(format!("attachShader({}, {})", program.0, shader.0));
    }

    fn detach_shader(&mut self, program: &ObjectId, shader: &ObjectId) {
        if let Some(state) = self.programs.get_mut(program) {
            state.shaders.retain(|attached| attached != shader);
        }
        self.record(format!("detachShader({}, {})", program.0, shader.0));
    }

    fn link_program(&mut self, program: &ObjectId) {
        let shaders = &self.shaders;
        if let Some(state) = self.programs.get_mut(program) {
            state.linked = !state.shaders.is_empty()
                && state
                    .shaders
                    .iter()
                    .all(|shader| shaders.get(shader).is_some_and(|s| s.compiled));
        }
        self.record(format!("linkProgram({})", program.0));
    }

    fn program_parameter(&mut self, program: &ObjectId, pname: u32) -> i32 {
        match (self.programs.get(program), pname) {
            (Some(state), consts::LINK_STATUS) => state.linked as i32,
            _ => 0,
        }
    }

    fn program_info_log(&mut self, program: &ObjectId) -> String {
        match self.programs.get(program) {
            Some(state) if !state.linked => "program not linked".to_string(),
            _ => String::new(),
        }
    }

    fn use_program(&mut self, program: Option<&ObjectId>) {
        self.record(format!("useProgram({})", id_of(program)));
    }

    fn attrib_location(&mut self, program: &ObjectId, name: &str) -> i32 {
        self.record(format!("getAttribLocation({}, {:?})", program.0, name));
        match self.programs.get(program) {
            Some(state) if state.linked => 0,
            _ => -1,
        }
    }

    fn bind_attrib_location(&mut self, program: &ObjectId, index: u32, name: &str) {
        self.record(format!(
            "bindAttribLocation({}, {}, {:?})",
            program.0, index, name
        ));
    }

    /// Linked programs resolve every name; unlinked programs resolve none.
    fn uniform_location(&mut self, program: &ObjectId, name: &str) -> Option<ObjectId> {
        let linked = self.programs.get(program).is_some_and(|state| state.linked);
        if !linked {
            return None;
        }
        if let Some(location) = self
            .programs
            .get(program)
            .and_then(|state| state.uniforms.get(name))
        {
            return Some(*location);
        }
        let location = ObjectId(self.next_id);
        self.next_id += 1;
        if let Some(state) = self.programs.get_mut(program) {
            state.uniforms.insert(name.to_string(), location);
        }
        Some(location)
    }

    fn uniform_floats(&mut self, location: Option<&ObjectId>, components: usize, values: &[f32]) {
        self.record(format!(
            "uniform{}f({}, {:?})",
            components,
            id_of(location),
            values
        ));
    }

    fn uniform_ints(&mut self, location: Option<&ObjectId>, components: usize, values: &[i32]) {
        self.record(format!(
            "uniform{}i({}, {:?})",
            components,
            id_of(location),
            values
        ));
    }

    fn uniform_matrix(
        &mut self,
        location: Option<&ObjectId>,
        dim: usize,
        transpose: bool,
        values: &[f32],
    ) {
        self.record(format!(
            "uniformMatrix{}fv({}, {}, {} floats)",
            dim,
            id_of(location),
            transpose,
            values.len()
        ));
    }

    fn bind_buffer(&mut self, target: u32, buffer: Option<&ObjectId>) {
        self.record(format!("bindBuffer({:#x}, {})", target, id_of(buffer)));
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<&ObjectId>) {
        self.record(format!("bindVertexArray({})", id_of(vertex_array)));
    }

    fn bind_texture(&mut self, target: u32, texture: Option<&ObjectId>) {
        self.record(format!("bindTexture({:#x}, {})", target, id_of(texture)));
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<&ObjectId>) {
        self.record(format!(
            "bindFramebuffer({:#x}, {})",
            target,
            id_of(framebuffer)
        ));
    }

    fn active_texture(&mut self, unit: u32) {
        self.record(format!("activeTexture({:#x})", unit));
    }

    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        self.record(format!(
            "bufferData({:#x}, {} bytes, {:#x})",
            target,
            data.len(),
            usage
        ));
    }

    fn buffer_data_size(&mut self, target: u32, size: u32, usage: u32) {
        self.record(format!(
            "bufferData({:#x}, {} zeroed bytes, {:#x})",
            target, size, usage
        ));
    }

    fn buffer_sub_data(&mut self, target: u32, offset: i32, data: &[u8]) {
        self.record(format!(
            "bufferSubData({:#x}, {}, {} bytes)",
            target,
            offset,
            data.len()
        ));
    }

    fn tex_image_2d(&mut self, image: &TexImage2D, pixels: Option<&[u8]>) {
        self.record(format!(
            "texImage2D({}x{}, {:#x}, {:#x}, {})",
            image.width,
            image.height,
            image.format,
            image.ty,
            pixels.map_or_else(|| "null".to_string(), |p| format!("{} bytes", p.len()))
        ));
    }

    fn tex_parameter_f(&mut self, target: u32, pname: u32, param: f32) {
        self.record(format!("texParameterf({:#x}, {:#x}, {})", target, pname, param));
    }

    fn tex_parameter_i(&mut self, target: u32, pname: u32, param: i32) {
        self.record(format!("texParameteri({:#x}, {:#x}, {})", target, pname, param));
    }

    fn generate_mipmap(&mut self, target: u32) {
        self.record(format!("generateMipmap({:#x})", target));
    }

    fn pixel_store_i(&mut self, pname: u32, param: i32) {
        self.record(format!("pixelStorei({:#x}, {})", pname, param));
    }

    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        tex_target: u32,
        texture: Option<&ObjectId>,
        level: i32,
    ) {
        self.record(format!(
            "framebufferTexture2D({:#x}, {:#x}, {:#x}, {}, {})",
            target,
            attachment,
            tex_target,
            id_of(texture),
            level
        ));
    }

    fn check_framebuffer_status(&mut self, _target: u32) -> u32 {
        consts::FRAMEBUFFER_COMPLETE
    }

    fn vertex_attrib_pointer(&mut self, layout: &AttribPointer) {
        self.record(format!(
            "vertexAttribPointer({}, {}, {:#x}, {}, {}, {})",
            layout.index, layout.size, layout.ty, layout.normalized, layout.stride, layout.offset
        ));
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.record(format!("enableVertexAttribArray({})", index));
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        self.record(format!("disableVertexAttribArray({})", index));
    }

    fn enable(&mut self, cap: u32) {
        self.enabled.insert(cap);
        self.record(format!("enable({:#x})", cap));
    }

    fn disable(&mut self, cap: u32) {
        self.enabled.remove(&cap);
        self.record(format!("disable({:#x})", cap));
    }

    fn is_enabled(&mut self, cap: u32) -> bool {
        self.enabled.contains(&cap)
    }

    fn blend_func(&mut self, src: u32, dst: u32) {
        self.record(format!("blendFunc({:#x}, {:#x})", src, dst));
    }

    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        self.record(format!(
            "blendFuncSeparate({:#x}, {:#x}, {:#x}, {:#x})",
            src_rgb, dst_rgb, src_alpha, dst_alpha
        ));
    }

    fn blend_equation(&mut self, mode: u32) {
        self.record(format!("blendEquation({:#x})", mode));
    }

    fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32) {
        self.record(format!(
            "blendEquationSeparate({:#x}, {:#x})",
            mode_rgb, mode_alpha
        ));
    }

    fn blend_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.record(format!("blendColor({}, {}, {}, {})", r, g, b, a));
    }

    fn depth_func(&mut self, func: u32) {
        self.record(format!("depthFunc({:#x})", func));
    }

    fn depth_mask(&mut self, flag: bool) {
        self.record(format!("depthMask({})", flag));
    }

    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        self.record(format!("colorMask({}, {}, {}, {})", r, g, b, a));
    }

    fn stencil_func(&mut self, func: u32, reference: i32, mask: u32) {
        self.record(format!("stencilFunc({:#x}, {}, {:#x})", func, reference, mask));
    }

    fn stencil_mask(&mut self, mask: u32) {
        self.record(format!("stencilMask({:#x})", mask));
    }

    fn stencil_op(&mut self, fail: u32, zfail: u32, zpass: u32) {
        self.record(format!("stencilOp({:#x}, {:#x}, {:#x})", fail, zfail, zpass));
    }

    fn cull_face(&mut self, face: u32) {
        self.record(format!("cullFace({:#x})", face));
    }

    fn front_face(&mut self, mode: u32) {
        self.record(format!("frontFace({:#x})", mode));
    }

    fn line_width(&mut self, width: f32) {
        self.record(format!("lineWidth({})", width));
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        self.record(format!("polygonOffset({}, {})", factor, units));
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.record(format!("viewport({}, {}, {}, {})", x, y, width, height));
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.record(format!("scissor({}, {}, {}, {})", x, y, width, height));
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.record(format!("clearColor({}, {}, {}, {})", r, g, b, a));
    }

    fn clear_depth(&mut self, depth: f32) {
        self.record(format!("clearDepth({})", depth));
    }

    fn clear_stencil(&mut self, stencil: i32) {
        self.record(format!("clearStencil({})", stencil));
    }

    fn clear(&mut self, mask: u32) {
        self.record(format!("clear({:#x})", mask));
    }

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        self.draw_calls += 1;
        self.record(format!("drawArrays({:#x}, {}, {})", mode, first, count));
    }

    fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: i32) {
        self.draw_calls += 1;
        self.record(format!(
            "drawElements({:#x}, {}, {:#x}, {})",
            mode, count, ty, offset
        ));
    }

    fn finish(&mut self) {
        self.record("finish()".to_string());
    }

    fn flush(&mut self) {
        self.record("flush()".to_string());
    }

    fn error(&mut self) -> u32 {
        consts::NO_ERROR
    }

    fn string_parameter(&mut self, name: u32) -> String {
        match name {
            consts::VENDOR => "zg".to_string(),
            consts::RENDERER => "zg headless".to_string(),
            consts::VERSION => "WebGL 2.0 (zg headless)".to_string(),
            consts::SHADING_LANGUAGE_VERSION => "WebGL GLSL ES 3.00".to_string(),
            _ => String::new(),
        }
    }
}
