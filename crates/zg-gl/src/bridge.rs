use crate::consts::UNPACK_ALIGNMENT;
use crate::driver::{GpuDriver, TexImage2D};
use crate::format::image_len;
use tracing::{debug, warn};
use zg_core::marshal::{read_array, read_concatenated_utf8, read_utf8, write_scalar, write_utf8};
use zg_core::memory::{read_bytes, view, view_mut};
use zg_core::{Error, Handle, HandleTable, ResourceKind, Result};

/// Resolves guest handles to driver objects and marshals guest memory
/// around every driver call.
///
/// Operations that touch guest memory take the memory slice as an argument.
/// The caller fetches it from the live instance right before the call, so a
/// grown memory is always seen.
///
/// Handle-free pass-through calls (`clear`, `viewport`, ...) go straight to
/// [`driver_mut`](Self::driver_mut).
pub struct GlBridge<D: GpuDriver> {
    driver: D,
    shaders: HandleTable<D::Shader>,
    programs: HandleTable<D::Program>,
    buffers: HandleTable<D::Buffer>,
    vertex_arrays: HandleTable<D::VertexArray>,
    textures: HandleTable<D::Texture>,
    framebuffers: HandleTable<D::Framebuffer>,
    uniform_locations: HandleTable<D::UniformLocation>,
    unpack_alignment: u32,
}

impl<D: GpuDriver> GlBridge<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            shaders: HandleTable::new(ResourceKind::Shader),
            programs: HandleTable::new(ResourceKind::Program),
            buffers: HandleTable::new(ResourceKind::Buffer),
            vertex_arrays: HandleTable::new(ResourceKind::VertexArray),
            textures: HandleTable::new(ResourceKind::Texture),
            framebuffers: HandleTable::new(ResourceKind::Framebuffer),
            uniform_locations: HandleTable::new(ResourceKind::UniformLocation),
            unpack_alignment: 4,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Number of live objects of `kind`. Socket sessions are not tracked here.
    pub fn live(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Shader => self.shaders.live(),
            ResourceKind::Program => self.programs.live(),
            ResourceKind::Buffer => self.buffers.live(),
            ResourceKind::VertexArray => self.vertex_arrays.live(),
            ResourceKind::Texture => self.textures.live(),
            ResourceKind::Framebuffer => self.framebuffers.live(),
            ResourceKind::UniformLocation => self.uniform_locations.live(),
            ResourceKind::SocketSession => 0,
        }
    }

    /// Release every live object through the driver. Handles stay
    /// tombstoned, so ids are not reused if the bridge is kept around.
    pub fn release_all(&mut self) {
        let driver = &mut self.driver;
        let mut released = 0;
        for (_, object) in self.framebuffers.release_all() {
            driver.delete_framebuffer(object);
            released += 1;
        }
        for (_, object) in self.textures.release_all() {
            driver.delete_texture(object);
            released += 1;
        }
        for (_, object) in self.vertex_arrays.release_all() {
            driver.delete_vertex_array(object);
            released += 1;
        }
        for (_, object) in self.buffers.release_all() {
            driver.delete_buffer(object);
            released += 1;
        }
        for (_, object) in self.programs.release_all() {
            driver.delete_program(object);
            released += 1;
        }
        for (_, object) in self.shaders.release_all() {
            driver.delete_shader(object);
            released += 1;
        }
        self.uniform_locations.release_all();
        debug!(released, "released GL objects");
    }

    // ---- Object creation ----

    pub fn create_shader(&mut self, ty: u32) -> u32 {
        let shader = self.driver.create_shader(ty);
        self.shaders.allocate(shader).get()
    }

    pub fn create_program(&mut self) -> u32 {
        let program = self.driver.create_program();
        self.programs.allocate(program).get()
    }

    pub fn create_buffer(&mut self) -> u32 {
        let buffer = self.driver.create_buffer();
        self.buffers.allocate(buffer).get()
    }

    pub fn create_framebuffer(&mut self) -> u32 {
        let framebuffer = self.driver.create_framebuffer();
        self.framebuffers.allocate(framebuffer).get()
    }

    pub fn gen_buffers(&mut self, memory: &mut [u8], count: u32, out_ptr: u32) -> Result<()> {
        let driver = &mut self.driver;
        gen_into(&mut self.buffers, memory, count, out_ptr, || driver.create_buffer())
    }

    pub fn gen_textures(&mut self, memory: &mut [u8], count: u32, out_ptr: u32) -> Result<()> {
        let driver = &mut self.driver;
        gen_into(&mut self.textures, memory, count, out_ptr, || driver.create_texture())
    }

    pub fn gen_vertex_arrays(&mut self, memory: &mut [u8], count: u32, out_ptr: u32) -> Result<()> {
        let driver = &mut self.driver;
        gen_into(&mut self.vertex_arrays, memory, count, out_ptr, || {
            driver.create_vertex_array()
        })
    }

    pub fn gen_framebuffers(&mut self, memory: &mut [u8], count: u32, out_ptr: u32) -> Result<()> {
        let driver = &mut self.driver;
        gen_into(&mut self.framebuffers, memory, count, out_ptr, || {
            driver.create_framebuffer()
        })
    }

    // ---- Deletion ----

    pub fn delete_shader(&mut self, shader: u32) -> Result<()> {
        let driver = &mut self.driver;
        self.shaders
            .delete_with(shader, |object| driver.delete_shader(object))
    }

    pub fn delete_program(&mut self, program: u32) -> Result<()> {
        let driver = &mut self.driver;
        self.programs
            .delete_with(program, |object| driver.delete_program(object))
    }

    pub fn delete_texture(&mut self, texture: u32) -> Result<()> {
        let driver = &mut self.driver;
        self.textures
            .delete_with(texture, |object| driver.delete_texture(object))
    }

    pub fn delete_buffers(&mut self, memory: &[u8], count: u32, ids_ptr: u32) -> Result<()> {
        let driver = &mut self.driver;
        delete_from(&mut self.buffers, memory, count, ids_ptr, |object| {
            driver.delete_buffer(object)
        })
    }

    pub fn delete_textures(&mut self, memory: &[u8], count: u32, ids_ptr: u32) -> Result<()> {
        let driver = &mut self.driver;
        delete_from(&mut self.textures, memory, count, ids_ptr, |object| {
            driver.delete_texture(object)
        })
    }

    pub fn delete_vertex_arrays(&mut self, memory: &[u8], count: u32, ids_ptr: u32) -> Result<()> {
        let driver = &mut self.driver;
        delete_from(&mut self.vertex_arrays, memory, count, ids_ptr, |object| {
            driver.delete_vertex_array(object)
        })
    }

    pub fn delete_framebuffers(&mut self, memory: &[u8], count: u32, ids_ptr: u32) -> Result<()> {
        let driver = &mut self.driver;
        delete_from(&mut self.framebuffers, memory, count, ids_ptr, |object| {
            driver.delete_framebuffer(object)
        })
    }

    // ---- Object queries ----
    //
    // A handle that is not live answers `false` without reaching the driver.

    pub fn is_shader(&mut self, shader: u32) -> bool {
        match self.shaders.lookup(shader) {
            Ok(object) => self.driver.is_shader(object),
            Err(_) => false,
        }
    }

    pub fn is_program(&mut self, program: u32) -> bool {
        match self.programs.lookup(program) {
            Ok(object) => self.driver.is_program(object),
            Err(_) => false,
        }
    }

    pub fn is_buffer(&mut self, buffer: u32) -> bool {
        match self.buffers.lookup(buffer) {
            Ok(object) => self.driver.is_buffer(object),
            Err(_) => false,
        }
    }

    pub fn is_texture(&mut self, texture: u32) -> bool {
        match self.textures.lookup(texture) {
            Ok(object) => self.driver.is_texture(object),
            Err(_) => false,
        }
    }

    pub fn is_framebuffer(&mut self, framebuffer: u32) -> bool {
        match self.framebuffers.lookup(framebuffer) {
            Ok(object) => self.driver.is_framebuffer(object),
            Err(_) => false,
        }
    }

    // ---- Shaders and programs ----

    /// Join `count` source fragments and set them as the shader source.
    pub fn shader_source(
        &mut self,
        memory: &[u8],
        shader: u32,
        count: u32,
        ptrs_ptr: u32,
        lens_ptr: u32,
    ) -> Result<()> {
        let object = self.shaders.lookup(shader)?;
        let source = read_concatenated_utf8(memory, ptrs_ptr, lens_ptr, count)?;
        self.driver.shader_source(object, &source);
        Ok(())
    }

    pub fn compile_shader(&mut self, shader: u32) -> Result<()> {
        let object = self.shaders.lookup(shader)?;
        self.driver.compile_shader(object);
        Ok(())
    }

    pub fn get_shaderiv(
        &mut self,
        memory: &mut [u8],
        shader: u32,
        pname: u32,
        out_ptr: u32,
    ) -> Result<()> {
        let object = self.shaders.lookup(shader)?;
        view_mut::<i32>(memory, out_ptr, 1)?;
        let value = self.driver.shader_parameter(object, pname);
        write_scalar(memory, out_ptr, value)
    }

    pub fn get_shader_info_log(
        &mut self,
        memory: &mut [u8],
        shader: u32,
        max_len: u32,
        len_ptr: u32,
        log_ptr: u32,
    ) -> Result<()> {
        let object = self.shaders.lookup(shader)?;
        let log = self.driver.shader_info_log(object);
        write_utf8(memory, log_ptr, max_len, len_ptr, &log)?;
        Ok(())
    }

    pub fn attach_shader(&mut self, program: u32, shader: u32) -> Result<()> {
        let program = self.programs.lookup(program)?;
        let shader = self.shaders.lookup(shader)?;
        self.driver.attach_shader(program, shader);
        Ok(())
    }

    pub fn detach_shader(&mut self, program: u32, shader: u32) -> Result<()> {
        let program = self.programs.lookup(program)?;
        let shader = self.shaders.lookup(shader)?;
        self.driver.detach_shader(program, shader);
        Ok(())
    }

    pub fn link_program(&mut self, program: u32) -> Result<()> {
        let object = self.programs.lookup(program)?;
        self.driver.link_program(object);
        Ok(())
    }

    pub fn get_programiv(
        &mut self,
        memory: &mut [u8],
        program: u32,
        pname: u32,
        out_ptr: u32,
    ) -> Result<()> {
        let object = self.programs.lookup(program)?;
        view_mut::<i32>(memory, out_ptr, 1)?;
        let value = self.driver.program_parameter(object, pname);
        write_scalar(memory, out_ptr, value)
    }

    pub fn get_program_info_log(
        &mut self,
        memory: &mut [u8],
        program: u32,
        max_len: u32,
        len_ptr: u32,
        log_ptr: u32,
    ) -> Result<()> {
        let object = self.programs.lookup(program)?;
        let log = self.driver.program_info_log(object);
        write_utf8(memory, log_ptr, max_len, len_ptr, &log)?;
        Ok(())
    }

    /// Bind `program`, or unbind with handle 0.
    pub fn use_program(&mut self, program: u32) -> Result<()> {
        let object = self.programs.lookup_nullable(program)?;
        self.driver.use_program(object);
        Ok(())
    }

    pub fn get_attrib_location(
        &mut self,
        memory: &[u8],
        program: u32,
        name_ptr: u32,
        name_len: u32,
    ) -> Result<i32> {
        let object = self.programs.lookup(program)?;
        let name = read_utf8(memory, name_ptr, name_len)?;
        Ok(self.driver.attrib_location(object, &name))
    }

    pub fn bind_attrib_location(
        &mut self,
        memory: &[u8],
        program: u32,
        index: u32,
        name_ptr: u32,
        name_len: u32,
    ) -> Result<()> {
        let object = self.programs.lookup(program)?;
        let name = read_utf8(memory, name_ptr, name_len)?;
        self.driver.bind_attrib_location(object, index, &name);
        Ok(())
    }

    /// Resolve a uniform and return its location handle. A uniform the
    /// driver does not know resolves to handle 0 and allocates nothing.
    pub fn get_uniform_location(
        &mut self,
        memory: &[u8],
        program: u32,
        name_ptr: u32,
        name_len: u32,
    ) -> Result<u32> {
        let object = self.programs.lookup(program)?;
        let name = read_utf8(memory, name_ptr, name_len)?;
        match self.driver.uniform_location(object, &name) {
            Some(location) => Ok(self.uniform_locations.allocate(location).get()),
            None => {
                debug!(%name, "uniform not found");
                Ok(Handle::NULL.get())
            }
        }
    }

    // ---- Uniforms ----

    /// `uniform{1,2,3,4}f`: one vector with `values.len()` components.
    pub fn uniform_floats(&mut self, location: u32, values: &[f32]) -> Result<()> {
        let location = self.uniform_locations.lookup_nullable(location)?;
        self.driver.uniform_floats(location, values.len(), values);
        Ok(())
    }

    /// `uniform{1,2,3,4}i`.
    pub fn uniform_ints(&mut self, location: u32, values: &[i32]) -> Result<()> {
        let location = self.uniform_locations.lookup_nullable(location)?;
        self.driver.uniform_ints(location, values.len(), values);
        Ok(())
    }

    /// `uniform{N}fv`: `count` vectors of `components` floats at `data_ptr`.
    pub fn uniform_fv(
        &mut self,
        memory: &[u8],
        location: u32,
        components: u32,
        count: u32,
        data_ptr: u32,
    ) -> Result<()> {
        let location = self.uniform_locations.lookup_nullable(location)?;
        let values = read_array::<f32>(memory, data_ptr, count, components)?;
        self.driver
            .uniform_floats(location, components as usize, &values);
        Ok(())
    }

    /// `uniform{N}iv`.
    pub fn uniform_iv(
        &mut self,
        memory: &[u8],
        location: u32,
        components: u32,
        count: u32,
        data_ptr: u32,
    ) -> Result<()> {
        let location = self.uniform_locations.lookup_nullable(location)?;
        let values = read_array::<i32>(memory, data_ptr, count, components)?;
        self.driver.uniform_ints(location, components as usize, &values);
        Ok(())
    }

    /// `uniformMatrix{N}fv`: `count` matrices of `dim * dim` floats.
    pub fn uniform_matrix_fv(
        &mut self,
        memory: &[u8],
        location: u32,
        dim: u32,
        count: u32,
        transpose: bool,
        data_ptr: u32,
    ) -> Result<()> {
        let location = self.uniform_locations.lookup_nullable(location)?;
        let values = read_array::<f32>(memory, data_ptr, count, dim * dim)?;
        self.driver
            .uniform_matrix(location, dim as usize, transpose, &values);
        Ok(())
    }

    // ---- Bindings ----

    pub fn bind_buffer(&mut self, target: u32, buffer: u32) -> Result<()> {
        let object = self.buffers.lookup_nullable(buffer)?;
        self.driver.bind_buffer(target, object);
        Ok(())
    }

    pub fn bind_vertex_array(&mut self, vertex_array: u32) -> Result<()> {
        let object = self.vertex_arrays.lookup_nullable(vertex_array)?;
        self.driver.bind_vertex_array(object);
        Ok(())
    }

    pub fn bind_texture(&mut self, target: u32, texture: u32) -> Result<()> {
        let object = self.textures.lookup_nullable(texture)?;
        self.driver.bind_texture(target, object);
        Ok(())
    }

    pub fn bind_framebuffer(&mut self, target: u32, framebuffer: u32) -> Result<()> {
        let object = self.framebuffers.lookup_nullable(framebuffer)?;
        self.driver.bind_framebuffer(target, object);
        Ok(())
    }

    /// Attach `texture` (or detach with handle 0) to the bound framebuffer.
    pub fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        tex_target: u32,
        texture: u32,
        level: i32,
    ) -> Result<()> {
        let object = self.textures.lookup_nullable(texture)?;
        self.driver
            .framebuffer_texture_2d(target, attachment, tex_target, object, level);
        Ok(())
    }

    // ---- Data uploads ----

    /// Upload `size` bytes at `data_ptr`. A null pointer asks the driver for
    /// `size` bytes of zeroed storage.
    pub fn buffer_data(
        &mut self,
        memory: &[u8],
        target: u32,
        size: u32,
        data_ptr: u32,
        usage: u32,
    ) -> Result<()> {
        if data_ptr == 0 {
            self.driver.buffer_data_size(target, size, usage);
        } else {
            let data = read_bytes(memory, data_ptr, size)?;
            self.driver.buffer_data(target, data, usage);
        }
        Ok(())
    }

    pub fn buffer_sub_data(
        &mut self,
        memory: &[u8],
        target: u32,
        offset: i32,
        size: u32,
        data_ptr: u32,
    ) -> Result<()> {
        let data = read_bytes(memory, data_ptr, size)?;
        self.driver.buffer_sub_data(target, offset, data);
        Ok(())
    }

    /// `pixelStorei`. `UNPACK_ALIGNMENT` is tracked for sizing texture
    /// uploads; every call goes to the driver.
    pub fn pixel_store_i(&mut self, pname: u32, param: i32) {
        if pname == UNPACK_ALIGNMENT {
            match param {
                1 | 2 | 4 | 8 => self.unpack_alignment = param as u32,
                _ => warn!(param, "ignoring invalid UNPACK_ALIGNMENT"),
            }
        }
        self.driver.pixel_store_i(pname, param);
    }

    /// Upload a texture image. The pixel data length is derived from the
    /// image's format, type and the current unpack alignment. A null
    /// `data_ptr` passes no data and needs no sizing.
    pub fn tex_image_2d(&mut self, memory: &[u8], image: &TexImage2D, data_ptr: u32) -> Result<()> {
        let pixels = if data_ptr == 0 {
            None
        } else {
            let len = image_len(
                image.width,
                image.height,
                image.format,
                image.ty,
                self.unpack_alignment,
            )?;
            Some(read_bytes(memory, data_ptr, len)?)
        };
        self.driver.tex_image_2d(image, pixels);
        Ok(())
    }

    // ---- Queries ----

    /// String-valued parameter, returned to the guest through its string
    /// allocator.
    pub fn query_string(&mut self, name: u32) -> String {
        self.driver.string_parameter(name)
    }

    pub fn screen_size(&self) -> (u32, u32) {
        self.driver.drawing_buffer_size()
    }
}

/// Validate the output array, create `count` objects and write their handles.
fn gen_into<T>(
    table: &mut HandleTable<T>,
    memory: &mut [u8],
    count: u32,
    out_ptr: u32,
    create: impl FnMut() -> T,
) -> Result<()> {
    let mut out = view_mut::<u32>(memory, out_ptr, count)?;
    let handles = table.allocate_many(count as usize, create);
    for (index, handle) in handles.iter().enumerate() {
        out.set(index, handle.get());
    }
    debug!(kind = %table.kind(), count, "generated objects");
    Ok(())
}

/// Delete every handle listed in the guest array, then report the ones that
/// failed.
fn delete_from<T>(
    table: &mut HandleTable<T>,
    memory: &[u8],
    count: u32,
    ids_ptr: u32,
    release: impl FnMut(T),
) -> Result<()> {
    let ids = view::<u32>(memory, ids_ptr, count)?.to_vec();
    let failed: Vec<u32> = table
        .delete_many(&ids, release)
        .into_iter()
        .filter_map(|err| {
            warn!(kind = %table.kind(), "batch delete: {}", err);
            match err {
                Error::InvalidHandle { handle, .. } => Some(handle),
                _ => None,
            }
        })
        .collect();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(Error::BatchFailed {
            kind: table.kind(),
            failed,
        })
    }
}
