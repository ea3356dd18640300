//! One wasm import per [`GlOp`].
//!
//! Handle-free calls go straight to the driver. Everything that resolves a
//! handle or touches guest memory goes through [`GlBridge`](zg_gl::GlBridge),
//! and its errors trap the guest.

use crate::host::{with_memory, with_state, BridgeState, HostFunctions};
use crate::{Error, Result};
use wasmtime::{Caller, Linker};
use zg_gl::{AttribPointer, GlOp, GpuDriver, TexImage2D};

type Ctx<'a, D> = Caller<'a, BridgeState<D>>;

macro_rules! import {
    ($linker:ident, $module:ident, $name:ident, |$caller:ident $(, $arg:ident: $ty:ty)*| $body:expr) => {
        $linker.func_wrap($module, $name, move |mut $caller: Ctx<'_, D>, $($arg: $ty),*| $body)
    };
}

/// Register the import for `op`.
///
/// Returns `false` for operations without a port; those are linked per
/// module by [`HostFunctions::register_unported`].
pub(crate) fn define<D>(linker: &mut Linker<BridgeState<D>>, module: &str, op: GlOp) -> Result<bool>
where
    D: GpuDriver + 'static,
{
    let name = op.symbol();
    let linked = match op {
        GlOp::ActiveTexture => import!(linker, module, name, |c, unit: u32| {
            c.data_mut().gl.driver_mut().active_texture(unit)
        }),
        GlOp::AttachShader => import!(linker, module, name, |c, program: u32, shader: u32| {
            with_state(&mut c, name, |s| s.gl.attach_shader(program, shader))
        }),
        GlOp::BindAttribLocationJs => import!(
            linker,
            module,
            name,
            |c, program: u32, index: u32, name_ptr: u32, name_len: u32| {
                with_memory(&mut c, name, |m, s| {
                    s.gl.bind_attrib_location(m, program, index, name_ptr, name_len)
                })
            }
        ),
        GlOp::BindBuffer => import!(linker, module, name, |c, target: u32, buffer: u32| {
            with_state(&mut c, name, |s| s.gl.bind_buffer(target, buffer))
        }),
        GlOp::BindFramebuffer => import!(linker, module, name, |c, target: u32, framebuffer: u32| {
            with_state(&mut c, name, |s| s.gl.bind_framebuffer(target, framebuffer))
        }),
        GlOp::BindTexture => import!(linker, module, name, |c, target: u32, texture: u32| {
            with_state(&mut c, name, |s| s.gl.bind_texture(target, texture))
        }),
        GlOp::BindVertexArray => import!(linker, module, name, |c, vertex_array: u32| {
            with_state(&mut c, name, |s| s.gl.bind_vertex_array(vertex_array))
        }),
        GlOp::BlendColor => import!(linker, module, name, |c, r: f32, g: f32, b: f32, a: f32| {
            c.data_mut().gl.driver_mut().blend_color(r, g, b, a)
        }),
        GlOp::BlendEquation => import!(linker, module, name, |c, mode: u32| {
            c.data_mut().gl.driver_mut().blend_equation(mode)
        }),
        GlOp::BlendEquationSeparate => import!(linker, module, name, |c, rgb: u32, alpha: u32| {
            c.data_mut().gl.driver_mut().blend_equation_separate(rgb, alpha)
        }),
        GlOp::BlendFunc => import!(linker, module, name, |c, src: u32, dst: u32| {
            c.data_mut().gl.driver_mut().blend_func(src, dst)
        }),
        GlOp::BlendFuncSeparate => import!(
            linker,
            module,
            name,
            |c, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32| {
                c.data_mut()
                    .gl
                    .driver_mut()
                    .blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha)
            }
        ),
        GlOp::BufferData => import!(
            linker,
            module,
            name,
            |c, target: u32, size: u32, data_ptr: u32, usage: u32| {
                with_memory(&mut c, name, |m, s| s.gl.buffer_data(m, target, size, data_ptr, usage))
            }
        ),
        GlOp::BufferSubData => import!(
            linker,
            module,
            name,
            |c, target: u32, offset: i32, size: u32, data_ptr: u32| {
                with_memory(&mut c, name, |m, s| {
                    s.gl.buffer_sub_data(m, target, offset, size, data_ptr)
                })
            }
        ),
        GlOp::CheckFramebufferStatus => import!(linker, module, name, |c, target: u32| {
            c.data_mut().gl.driver_mut().check_framebuffer_status(target)
        }),
        GlOp::Clear => import!(linker, module, name, |c, mask: u32| {
            c.data_mut().gl.driver_mut().clear(mask)
        }),
        GlOp::ClearColor => import!(linker, module, name, |c, r: f32, g: f32, b: f32, a: f32| {
            c.data_mut().gl.driver_mut().clear_color(r, g, b, a)
        }),
        GlOp::ClearDepthf => import!(linker, module, name, |c, depth: f32| {
            c.data_mut().gl.driver_mut().clear_depth(depth)
        }),
        GlOp::ClearStencil => import!(linker, module, name, |c, stencil: i32| {
            c.data_mut().gl.driver_mut().clear_stencil(stencil)
        }),
        GlOp::ColorMask => import!(linker, module, name, |c, r: u32, g: u32, b: u32, a: u32| {
            c.data_mut()
                .gl
                .driver_mut()
                .color_mask(r != 0, g != 0, b != 0, a != 0)
        }),
        GlOp::CompileShader => import!(linker, module, name, |c, shader: u32| {
            with_state(&mut c, name, |s| s.gl.compile_shader(shader))
        }),
        GlOp::CreateBuffer => import!(linker, module, name, |c| c.data_mut().gl.create_buffer()),
        GlOp::CreateFramebuffer => {
            import!(linker, module, name, |c| c.data_mut().gl.create_framebuffer())
        }
        GlOp::CreateProgram => import!(linker, module, name, |c| c.data_mut().gl.create_program()),
        GlOp::CreateShader => import!(linker, module, name, |c, ty: u32| {
            c.data_mut().gl.create_shader(ty)
        }),
        GlOp::CullFace => import!(linker, module, name, |c, face: u32| {
            c.data_mut().gl.driver_mut().cull_face(face)
        }),
        GlOp::DeleteBuffers => import!(linker, module, name, |c, count: u32, ids_ptr: u32| {
            with_memory(&mut c, name, |m, s| s.gl.delete_buffers(m, count, ids_ptr))
        }),
        GlOp::DeleteFramebuffers => import!(linker, module, name, |c, count: u32, ids_ptr: u32| {
            with_memory(&mut c, name, |m, s| s.gl.delete_framebuffers(m, count, ids_ptr))
        }),
        GlOp::DeleteProgram => import!(linker, module, name, |c, program: u32| {
            with_state(&mut c, name, |s| s.gl.delete_program(program))
        }),
        GlOp::DeleteShader => import!(linker, module, name, |c, shader: u32| {
            with_state(&mut c, name, |s| s.gl.delete_shader(shader))
        }),
        GlOp::DeleteTexture => import!(linker, module, name, |c, texture: u32| {
            with_state(&mut c, name, |s| s.gl.delete_texture(texture))
        }),
        GlOp::DeleteTextures => import!(linker, module, name, |c, count: u32, ids_ptr: u32| {
            with_memory(&mut c, name, |m, s| s.gl.delete_textures(m, count, ids_ptr))
        }),
        GlOp::DeleteVertexArrays => import!(linker, module, name, |c, count: u32, ids_ptr: u32| {
            with_memory(&mut c, name, |m, s| s.gl.delete_vertex_arrays(m, count, ids_ptr))
        }),
        GlOp::DepthFunc => import!(linker, module, name, |c, func: u32| {
            c.data_mut().gl.driver_mut().depth_func(func)
        }),
        GlOp::DepthMask => import!(linker, module, name, |c, flag: u32| {
            c.data_mut().gl.driver_mut().depth_mask(flag != 0)
        }),
        GlOp::DetachShader => import!(linker, module, name, |c, program: u32, shader: u32| {
            with_state(&mut c, name, |s| s.gl.detach_shader(program, shader))
        }),
        GlOp::Disable => import!(linker, module, name, |c, cap: u32| {
            c.data_mut().gl.driver_mut().disable(cap)
        }),
        GlOp::DisableVertexAttribArray => import!(linker, module, name, |c, index: u32| {
            c.data_mut().gl.driver_mut().disable_vertex_attrib_array(index)
        }),
        GlOp::DrawArrays => import!(linker, module, name, |c, mode: u32, first: i32, count: i32| {
            c.data_mut().gl.driver_mut().draw_arrays(mode, first, count)
        }),
        GlOp::DrawElements => import!(
            linker,
            module,
            name,
            |c, mode: u32, count: i32, ty: u32, offset: i32| {
                c.data_mut().gl.driver_mut().draw_elements(mode, count, ty, offset)
            }
        ),
        GlOp::Enable => import!(linker, module, name, |c, cap: u32| {
            c.data_mut().gl.driver_mut().enable(cap)
        }),
        GlOp::EnableVertexAttribArray => import!(linker, module, name, |c, index: u32| {
            c.data_mut().gl.driver_mut().enable_vertex_attrib_array(index)
        }),
        GlOp::Finish => import!(linker, module, name, |c| c.data_mut().gl.driver_mut().finish()),
        GlOp::Flush => import!(linker, module, name, |c| c.data_mut().gl.driver_mut().flush()),
        GlOp::FramebufferTexture2D => import!(
            linker,
            module,
            name,
            |c, target: u32, attachment: u32, tex_target: u32, texture: u32, level: i32| {
                with_state(&mut c, name, |s| {
                    s.gl
                        .framebuffer_texture_2d(target, attachment, tex_target, texture, level)
                })
            }
        ),
        GlOp::FrontFace => import!(linker, module, name, |c, mode: u32| {
            c.data_mut().gl.driver_mut().front_face(mode)
        }),
        GlOp::GenBuffers => import!(linker, module, name, |c, count: u32, out_ptr: u32| {
            with_memory(&mut c, name, |m, s| s.gl.gen_buffers(m, count, out_ptr))
        }),
        GlOp::GenerateMipmap => import!(linker, module, name, |c, target: u32| {
            c.data_mut().gl.driver_mut().generate_mipmap(target)
        }),
        GlOp::GenFramebuffers => import!(linker, module, name, |c, count: u32, out_ptr: u32| {
            with_memory(&mut c, name, |m, s| s.gl.gen_framebuffers(m, count, out_ptr))
        }),
        GlOp::GenTextures => import!(linker, module, name, |c, count: u32, out_ptr: u32| {
            with_memory(&mut c, name, |m, s| s.gl.gen_textures(m, count, out_ptr))
        }),
        GlOp::GenVertexArrays => import!(linker, module, name, |c, count: u32, out_ptr: u32| {
            with_memory(&mut c, name, |m, s| s.gl.gen_vertex_arrays(m, count, out_ptr))
        }),
        GlOp::GetAttribLocation => import!(
            linker,
            module,
            name,
            |c, program: u32, name_ptr: u32, name_len: u32| {
                with_memory(&mut c, name, |m, s| {
                    s.gl.get_attrib_location(m, program, name_ptr, name_len)
                })
            }
        ),
        GlOp::GetError => import!(linker, module, name, |c| c.data_mut().gl.driver_mut().error()),
        GlOp::GetProgramInfoLog => import!(
            linker,
            module,
            name,
            |c, program: u32, max_len: u32, len_ptr: u32, log_ptr: u32| {
                with_memory(&mut c, name, |m, s| {
                    s.gl.get_program_info_log(m, program, max_len, len_ptr, log_ptr)
                })
            }
        ),
        GlOp::GetProgramiv => import!(
            linker,
            module,
            name,
            |c, program: u32, pname: u32, out_ptr: u32| {
                with_memory(&mut c, name, |m, s| s.gl.get_programiv(m, program, pname, out_ptr))
            }
        ),
        GlOp::GetShaderInfoLog => import!(
            linker,
            module,
            name,
            |c, shader: u32, max_len: u32, len_ptr: u32, log_ptr: u32| {
                with_memory(&mut c, name, |m, s| {
                    s.gl.get_shader_info_log(m, shader, max_len, len_ptr, log_ptr)
                })
            }
        ),
        GlOp::GetShaderiv => import!(
            linker,
            module,
            name,
            |c, shader: u32, pname: u32, out_ptr: u32| {
                with_memory(&mut c, name, |m, s| s.gl.get_shaderiv(m, shader, pname, out_ptr))
            }
        ),
        GlOp::GetStringJs => import!(linker, module, name, |c, parameter: u32| {
            HostFunctions::get_string(&mut c, parameter)
        }),
        GlOp::GetUniformLocation => import!(
            linker,
            module,
            name,
            |c, program: u32, name_ptr: u32, name_len: u32| {
                with_memory(&mut c, name, |m, s| {
                    s.gl.get_uniform_location(m, program, name_ptr, name_len)
                })
            }
        ),
        GlOp::IsBuffer => import!(linker, module, name, |c, buffer: u32| {
            c.data_mut().gl.is_buffer(buffer) as u32
        }),
        GlOp::IsEnabled => import!(linker, module, name, |c, cap: u32| {
            c.data_mut().gl.driver_mut().is_enabled(cap) as u32
        }),
        GlOp::IsFramebuffer => import!(linker, module, name, |c, framebuffer: u32| {
            c.data_mut().gl.is_framebuffer(framebuffer) as u32
        }),
        GlOp::IsProgram => import!(linker, module, name, |c, program: u32| {
            c.data_mut().gl.is_program(program) as u32
        }),
        GlOp::IsShader => import!(linker, module, name, |c, shader: u32| {
            c.data_mut().gl.is_shader(shader) as u32
        }),
        GlOp::IsTexture => import!(linker, module, name, |c, texture: u32| {
            c.data_mut().gl.is_texture(texture) as u32
        }),
        GlOp::LineWidth => import!(linker, module, name, |c, width: f32| {
            c.data_mut().gl.driver_mut().line_width(width)
        }),
        GlOp::LinkProgram => import!(linker, module, name, |c, program: u32| {
            with_state(&mut c, name, |s| s.gl.link_program(program))
        }),
        GlOp::PixelStorei => import!(linker, module, name, |c, pname: u32, param: i32| {
            c.data_mut().gl.pixel_store_i(pname, param)
        }),
        GlOp::PolygonOffset => import!(linker, module, name, |c, factor: f32, units: f32| {
            c.data_mut().gl.driver_mut().polygon_offset(factor, units)
        }),
        GlOp::Scissor => import!(
            linker,
            module,
            name,
            |c, x: i32, y: i32, width: i32, height: i32| {
                c.data_mut().gl.driver_mut().scissor(x, y, width, height)
            }
        ),
        GlOp::ShaderSource => import!(
            linker,
            module,
            name,
            |c, shader: u32, count: u32, ptrs_ptr: u32, lens_ptr: u32| {
                with_memory(&mut c, name, |m, s| {
                    s.gl.shader_source(m, shader, count, ptrs_ptr, lens_ptr)
                })
            }
        ),
        GlOp::StencilFunc => import!(linker, module, name, |c, func: u32, reference: i32, mask: u32| {
            c.data_mut().gl.driver_mut().stencil_func(func, reference, mask)
        }),
        GlOp::StencilMask => import!(linker, module, name, |c, mask: u32| {
            c.data_mut().gl.driver_mut().stencil_mask(mask)
        }),
        GlOp::StencilOp => import!(linker, module, name, |c, fail: u32, zfail: u32, zpass: u32| {
            c.data_mut().gl.driver_mut().stencil_op(fail, zfail, zpass)
        }),
        GlOp::TexImage2D => import!(
            linker,
            module,
            name,
            |c,
             target: u32,
             level: i32,
             internal_format: i32,
             width: i32,
             height: i32,
             border: i32,
             format: u32,
             ty: u32,
             data_ptr: u32| {
                let image = TexImage2D {
                    target,
                    level,
                    internal_format,
                    width,
                    height,
                    border,
                    format,
                    ty,
                };
                with_memory(&mut c, name, |m, s| s.gl.tex_image_2d(m, &image, data_ptr))
            }
        ),
        GlOp::TexParameterf => import!(linker, module, name, |c, target: u32, pname: u32, param: f32| {
            c.data_mut().gl.driver_mut().tex_parameter_f(target, pname, param)
        }),
        GlOp::TexParameteri => import!(linker, module, name, |c, target: u32, pname: u32, param: i32| {
            c.data_mut().gl.driver_mut().tex_parameter_i(target, pname, param)
        }),
        GlOp::Uniform1f => import!(linker, module, name, |c, location: u32, x: f32| {
            with_state(&mut c, name, |s| s.gl.uniform_floats(location, &[x]))
        }),
        GlOp::Uniform1fv => import!(linker, module, name, |c, location: u32, count: u32, ptr: u32| {
            with_memory(&mut c, name, |m, s| s.gl.uniform_fv(m, location, 1, count, ptr))
        }),
        GlOp::Uniform1i => import!(linker, module, name, |c, location: u32, x: i32| {
            with_state(&mut c, name, |s| s.gl.uniform_ints(location, &[x]))
        }),
        GlOp::Uniform1iv => import!(linker, module, name, |c, location: u32, count: u32, ptr: u32| {
            with_memory(&mut c, name, |m, s| s.gl.uniform_iv(m, location, 1, count, ptr))
        }),
        GlOp::Uniform2f => import!(linker, module, name, |c, location: u32, x: f32, y: f32| {
            with_state(&mut c, name, |s| s.gl.uniform_floats(location, &[x, y]))
        }),
        GlOp::Uniform2fv => import!(linker, module, name, |c, location: u32, count: u32, ptr: u32| {
            with_memory(&mut c, name, |m, s| s.gl.uniform_fv(m, location, 2, count, ptr))
        }),
        GlOp::Uniform2i => import!(linker, module, name, |c, location: u32, x: i32, y: i32| {
            with_state(&mut c, name, |s| s.gl.uniform_ints(location, &[x, y]))
        }),
        GlOp::Uniform2iv => import!(linker, module, name, |c, location: u32, count: u32, ptr: u32| {
            with_memory(&mut c, name, |m, s| s.gl.uniform_iv(m, location, 2, count, ptr))
        }),
        GlOp::Uniform3f => import!(
            linker,
            module,
            name,
            |c, location: u32, x: f32, y: f32, z: f32| {
                with_state(&mut c, name, |s| s.gl.uniform_floats(location, &[x, y, z]))
            }
        ),
        GlOp::Uniform3fv => import!(linker, module, name, |c, location: u32, count: u32, ptr: u32| {
            with_memory(&mut c, name, |m, s| s.gl.uniform_fv(m, location, 3, count, ptr))
        }),
        GlOp::Uniform3i => import!(
            linker,
            module,
            name,
            |c, location: u32, x: i32, y: i32, z: i32| {
                with_state(&mut c, name, |s| s.gl.uniform_ints(location, &[x, y, z]))
            }
        ),
        GlOp::Uniform3iv => import!(linker, module, name, |c, location: u32, count: u32, ptr: u32| {
            with_memory(&mut c, name, |m, s| s.gl.uniform_iv(m, location, 3, count, ptr))
        }),
        GlOp::Uniform4f => import!(
            linker,
            module,
            name,
            |c, location: u32, x: f32, y: f32, z: f32, w: f32| {
                with_state(&mut c, name, |s| s.gl.uniform_floats(location, &[x, y, z, w]))
            }
        ),
        GlOp::Uniform4fv => import!(linker, module, name, |c, location: u32, count: u32, ptr: u32| {
            with_memory(&mut c, name, |m, s| s.gl.uniform_fv(m, location, 4, count, ptr))
        }),
        GlOp::Uniform4i => import!(
            linker,
            module,
            name,
            |c, location: u32, x: i32, y: i32, z: i32, w: i32| {
                with_state(&mut c, name, |s| s.gl.uniform_ints(location, &[x, y, z, w]))
            }
        ),
        GlOp::Uniform4iv => import!(linker, module, name, |c, location: u32, count: u32, ptr: u32| {
            with_memory(&mut c, name, |m, s| s.gl.uniform_iv(m, location, 4, count, ptr))
        }),
        GlOp::UniformMatrix2fv => import!(
            linker,
            module,
            name,
            |c, location: u32, count: u32, transpose: u32, ptr: u32| {
                with_memory(&mut c, name, |m, s| {
                    s.gl.uniform_matrix_fv(m, location, 2, count, transpose != 0, ptr)
                })
            }
        ),
        GlOp::UniformMatrix3fv => import!(
            linker,
            module,
            name,
            |c, location: u32, count: u32, transpose: u32, ptr: u32| {
                with_memory(&mut c, name, |m, s| {
                    s.gl.uniform_matrix_fv(m, location, 3, count, transpose != 0, ptr)
                })
            }
        ),
        GlOp::UniformMatrix4fv => import!(
            linker,
            module,
            name,
            |c, location: u32, count: u32, transpose: u32, ptr: u32| {
                with_memory(&mut c, name, |m, s| {
                    s.gl.uniform_matrix_fv(m, location, 4, count, transpose != 0, ptr)
                })
            }
        ),
        GlOp::UseProgram => import!(linker, module, name, |c, program: u32| {
            with_state(&mut c, name, |s| s.gl.use_program(program))
        }),
        GlOp::VertexAttribPointer => import!(
            linker,
            module,
            name,
            |c, index: u32, size: i32, ty: u32, normalized: u32, stride: i32, offset: i32| {
                let layout = AttribPointer {
                    index,
                    size,
                    ty,
                    normalized: normalized != 0,
                    stride,
                    offset,
                };
                c.data_mut().gl.driver_mut().vertex_attrib_pointer(&layout)
            }
        ),
        GlOp::Viewport => import!(
            linker,
            module,
            name,
            |c, x: i32, y: i32, width: i32, height: i32| {
                c.data_mut().gl.driver_mut().viewport(x, y, width, height)
            }
        ),

        GlOp::BindAttribLocation
        | GlOp::BindRenderbuffer
        | GlOp::CompressedTexImage2D
        | GlOp::CompressedTexSubImage2D
        | GlOp::CopyTexImage2D
        | GlOp::CopyTexSubImage2D
        | GlOp::DeleteRenderbuffers
        | GlOp::DepthRangef
        | GlOp::FramebufferRenderbuffer
        | GlOp::GenRenderbuffers
        | GlOp::GetActiveAttrib
        | GlOp::GetActiveUniform
        | GlOp::GetAttachedShaders
        | GlOp::GetBooleanv
        | GlOp::GetBufferParameteriv
        | GlOp::GetFloatv
        | GlOp::GetFramebufferAttachmentParameteriv
        | GlOp::GetIntegerv
        | GlOp::GetRenderbufferParameteriv
        | GlOp::GetShaderPrecisionFormat
        | GlOp::GetShaderSource
        | GlOp::GetTexParameterfv
        | GlOp::GetTexParameteriv
        | GlOp::GetUniformfv
        | GlOp::GetUniformiv
        | GlOp::GetVertexAttribfv
        | GlOp::GetVertexAttribiv
        | GlOp::GetVertexAttribPointerv
        | GlOp::Hint
        | GlOp::IsRenderbuffer
        | GlOp::ReadPixels
        | GlOp::ReleaseShaderCompiler
        | GlOp::RenderbufferStorage
        | GlOp::SampleCoverage
        | GlOp::ShaderBinary
        | GlOp::StencilFuncSeparate
        | GlOp::StencilMaskSeparate
        | GlOp::StencilOpSeparate
        | GlOp::TexParameterfv
        | GlOp::TexParameteriv
        | GlOp::TexSubImage2D
        | GlOp::ValidateProgram
        | GlOp::VertexAttrib1f
        | GlOp::VertexAttrib1fv
        | GlOp::VertexAttrib2f
        | GlOp::VertexAttrib2fv
        | GlOp::VertexAttrib3f
        | GlOp::VertexAttrib3fv
        | GlOp::VertexAttrib4f
        | GlOp::VertexAttrib4fv => return Ok(false),
    };
    linked.map_err(|e| Error::Wasm(format!("{}: {}", name, e)))?;
    Ok(true)
}
