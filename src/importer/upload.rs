use crate::pipeline::error::EngineError;
use crate::pipeline::input::Input;
use crate::pipeline::resource::{CommandArgs, ResourceArgs, ResourceId, ResourceOptions, ResourceRef};
use crate::pipeline::stack::Stack;

pub const UPLOAD_RESOURCE: &str = "azcopy-vhd";

/// `azcopy cp {source} '{signed url}' --blob-type='PageBlob'`
pub fn azcopy_command(source: Input, signed_url: Input) -> Input {
    Input::format(
        "azcopy cp {} '{}' --blob-type='PageBlob'",
        vec![source, signed_url],
    )
}

/// Declares the page-blob transfer of `source` to `signed_url`
pub fn declare_upload<'a>(
    stack: &mut Stack,
    source: Input,
    signed_url: Input,
    depends_on: impl IntoIterator<Item = &'a ResourceId>,
) -> Result<ResourceRef, EngineError> {
    stack.declare(
        UPLOAD_RESOURCE,
        ResourceArgs::Command(CommandArgs {
            create: azcopy_command(source, signed_url),
        }),
        ResourceOptions::new().depends_on(depends_on),
    )
}
