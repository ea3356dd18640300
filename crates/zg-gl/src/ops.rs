//! The complete set of GL imports a guest may link against.

macro_rules! gl_ops {
    ($($variant:ident => $symbol:literal,)*) => {
        /// One guest-visible GL import.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum GlOp {
            $($variant,)*
        }

        impl GlOp {
            /// Every operation, sorted by import name.
            pub const ALL: &'static [GlOp] = &[$(GlOp::$variant,)*];

            /// Import name in the guest's import module.
            pub fn symbol(self) -> &'static str {
                match self {
                    $(GlOp::$variant => $symbol,)*
                }
            }

            /// Look up an operation by import name.
            pub fn from_symbol(symbol: &str) -> Option<GlOp> {
                match symbol {
                    $($symbol => Some(GlOp::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

gl_ops! {
    ActiveTexture => "activeTexture",
    AttachShader => "attachShader",
    BindAttribLocation => "bindAttribLocation",
    BindAttribLocationJs => "bindAttribLocationJs",
    BindBuffer => "bindBuffer",
    BindFramebuffer => "bindFramebuffer",
    BindRenderbuffer => "bindRenderbuffer",
    BindTexture => "bindTexture",
    BindVertexArray => "bindVertexArray",
    BlendColor => "blendColor",
    BlendEquation => "blendEquation",
    BlendEquationSeparate => "blendEquationSeparate",
    BlendFunc => "blendFunc",
    BlendFuncSeparate => "blendFuncSeparate",
    BufferData => "bufferData",
    BufferSubData => "bufferSubData",
    CheckFramebufferStatus => "checkFramebufferStatus",
    Clear => "clear",
    ClearColor => "clearColor",
    ClearDepthf => "clearDepthf",
    ClearStencil => "clearStencil",
    ColorMask => "colorMask",
    CompileShader => "compileShader",
    CompressedTexImage2D => "compressedTexImage2D",
    CompressedTexSubImage2D => "compressedTexSubImage2D",
    CopyTexImage2D => "copyTexImage2D",
    CopyTexSubImage2D => "copyTexSubImage2D",
    CreateBuffer => "createBuffer",
    CreateFramebuffer => "createFramebuffer",
    CreateProgram => "createProgram",
    CreateShader => "createShader",
    CullFace => "cullFace",
    DeleteBuffers => "deleteBuffers",
    DeleteFramebuffers => "deleteFramebuffers",
    DeleteProgram => "deleteProgram",
    DeleteRenderbuffers => "deleteRenderbuffers",
    DeleteShader => "deleteShader",
    DeleteTexture => "deleteTexture",
    DeleteTextures => "deleteTextures",
    DeleteVertexArrays => "deleteVertexArrays",
    DepthFunc => "depthFunc",
    DepthMask => "depthMask",
    DepthRangef => "depthRangef",
    DetachShader => "detachShader",
    Disable => "disable",
    DisableVertexAttribArray => "disableVertexAttribArray",
    DrawArrays => "drawArrays",
    DrawElements => "drawElements",
    Enable => "enable",
    EnableVertexAttribArray => "enableVertexAttribArray",
    Finish => "finish",
    Flush => "flush",
    FramebufferRenderbuffer => "framebufferRenderbuffer",
    FramebufferTexture2D => "framebufferTexture2D",
    FrontFace => "frontFace",
    GenBuffers => "genBuffers",
    GenerateMipmap => "generateMipmap",
    GenFramebuffers => "genFramebuffers",
    GenRenderbuffers => "genRenderbuffers",
    GenTextures => "genTextures",
    GenVertexArrays => "genVertexArrays",
    GetActiveAttrib => "getActiveAttrib",
    GetActiveUniform => "getActiveUniform",
    GetAttachedShaders => "getAttachedShaders",
    GetAttribLocation => "getAttribLocation_",
    GetBooleanv => "getBooleanv",
    GetBufferParameteriv => "getBufferParameteriv",
    GetError => "getError",
    GetFloatv => "getFloatv",
    GetFramebufferAttachmentParameteriv => "getFramebufferAttachmentParameteriv",
    GetIntegerv => "getIntegerv",
    GetProgramInfoLog => "getProgramInfoLog",
    GetProgramiv => "getProgramiv",
    GetRenderbufferParameteriv => "getRenderbufferParameteriv",
    GetShaderInfoLog => "getShaderInfoLog",
    GetShaderiv => "getShaderiv",
    GetShaderPrecisionFormat => "getShaderPrecisionFormat",
    GetShaderSource => "getShaderSource",
    GetStringJs => "getStringJs",
    GetTexParameterfv => "getTexParameterfv",
    GetTexParameteriv => "getTexParameteriv",
    GetUniformfv => "getUniformfv",
    GetUniformiv => "getUniformiv",
    GetUniformLocation => "getUniformLocation_",
    GetVertexAttribfv => "getVertexAttribfv",
    GetVertexAttribiv => "getVertexAttribiv",
    GetVertexAttribPointerv => "getVertexAttribPointerv",
    Hint => "hint",
    IsBuffer => "isBuffer",
    IsEnabled => "isEnabled",
    IsFramebuffer => "isFramebuffer",
    IsProgram => "isProgram",
    IsRenderbuffer => "isRenderbuffer",
    IsShader => "isShader",
    IsTexture => "isTexture",
    LineWidth => "lineWidth",
    LinkProgram => "linkProgram",
    PixelStorei => "pixelStorei",
    PolygonOffset => "polygonOffset",
    ReadPixels => "readPixels",
    ReleaseShaderCompiler => "releaseShaderCompiler",
    RenderbufferStorage => "renderbufferStorage",
    SampleCoverage => "sampleCoverage",
    Scissor => "scissor",
    ShaderBinary => "shaderBinary",
    ShaderSource => "shaderSource",
    StencilFunc => "stencilFunc",
    StencilFuncSeparate => "stencilFuncSeparate",
    StencilMask => "stencilMask",
    StencilMaskSeparate => "stencilMaskSeparate",
    StencilOp => "stencilOp",
    StencilOpSeparate => "stencilOpSeparate",
    TexImage2D => "texImage2D",
    TexParameterf => "texParameterf",
    TexParameterfv => "texParameterfv",
    TexParameteri => "texParameteri",
    TexParameteriv => "texParameteriv",
    TexSubImage2D => "texSubImage2D",
    Uniform1f => "uniform1f",
    Uniform1fv => "uniform1fv",
    Uniform1i => "uniform1i",
    Uniform1iv => "uniform1iv",
    Uniform2f => "uniform2f",
    Uniform2fv => "uniform2fv",
    Uniform2i => "uniform2i",
    Uniform2iv => "uniform2iv",
    Uniform3f => "uniform3f",
    Uniform3fv => "uniform3fv",
    Uniform3i => "uniform3i",
    Uniform3iv => "uniform3iv",
    Uniform4f => "uniform4f",
    Uniform4fv => "uniform4fv",
    Uniform4i => "uniform4i",
    Uniform4iv => "uniform4iv",
    UniformMatrix2fv => "uniformMatrix2fv",
    UniformMatrix3fv => "uniformMatrix3fv",
    UniformMatrix4fv => "uniformMatrix4fv",
    UseProgram => "useProgram",
    ValidateProgram => "validateProgram",
    VertexAttrib1f => "vertexAttrib1f",
    VertexAttrib1fv => "vertexAttrib1fv",
    VertexAttrib2f => "vertexAttrib2f",
    VertexAttrib2fv => "vertexAttrib2fv",
    VertexAttrib3f => "vertexAttrib3f",
    VertexAttrib3fv => "vertexAttrib3fv",
    VertexAttrib4f => "vertexAttrib4f",
    VertexAttrib4fv => "vertexAttrib4fv",
    VertexAttribPointer => "vertexAttribPointer",
    Viewport => "viewport",
}

impl GlOp {
    /// Whether the bridge forwards this operation to the driver. Calling an
    /// unported operation fails with `NotImplemented`.
    pub fn is_ported(self) -> bool {
        !matches!(
            self,
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
                | GlOp::VertexAttrib4fv
        )
    }

    /// The error an unported operation fails with.
    pub fn not_implemented(self) -> zg_core::Error {
        zg_core::Error::NotImplemented(self.symbol())
    }
}

impl std::fmt::Display for GlOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_round_trip() {
        for &op in GlOp::ALL {
            assert_eq!(GlOp::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(GlOp::from_symbol("glClear"), None);
    }

    #[test]
    fn suffixed_imports_keep_their_names() {
        assert_eq!(GlOp::GetUniformLocation.symbol(), "getUniformLocation_");
        assert_eq!(GlOp::GetAttribLocation.symbol(), "getAttribLocation_");
        assert_eq!(GlOp::GetStringJs.symbol(), "getStringJs");
    }

    #[test]
    fn ported_and_unported_split() {
        assert!(GlOp::TexImage2D.is_ported());
        assert!(GlOp::DeleteFramebuffers.is_ported());
        assert!(!GlOp::ReadPixels.is_ported());
        assert!(matches!(
            GlOp::Hint.not_implemented(),
            zg_core::Error::NotImplemented("hint")
        ));
        let unported = GlOp::ALL.iter().filter(|op| !op.is_ported()).count();
        assert_eq!(unported, 50);
    }
}
